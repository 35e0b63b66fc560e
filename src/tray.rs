//! System tray: docking strip for notification icons.
//!
//! Ownership of the `_NET_SYSTEM_TRAY_S<screen>` selection is what makes a
//! tray *the* tray for a screen, so at most one can exist per display. Icons
//! are embedded with the XEmbed protocol and laid out left to right.

use std::collections::VecDeque;

use anyhow::Result;
use xcb::{Window, Atom};

use crate::xconnection::{
    XConn, Rectangle, TRAY_EVENT_MASK, TRAY_ICON_EVENT_MASK, EVENT_MASK_NO_EVENT,
    EVENT_MASK_STRUCTURE_NOTIFY,
};

/// Opcode of a dock request in a `_NET_SYSTEM_TRAY_OPCODE` message
pub const SYSTEM_TRAY_REQUEST_DOCK: u32 = 0;
const XEMBED_EMBEDDED_NOTIFY: u32 = 0;
const SYSTEM_TRAY_ORIENTATION_HORZ: u32 = 0;
const CURRENT_TIME: u32 = 0;

/// Atoms used by the tray protocols
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TrayAtoms {
    /// `_NET_SYSTEM_TRAY_S<screen>`
    pub selection: Atom,
    pub opcode: Atom,
    pub manager: Atom,
    pub orientation: Atom,
    pub xembed: Atom,
    /// Present on windows that want to be embedded rather than managed
    pub xembed_info: Atom,
}

impl TrayAtoms {
    pub fn intern<X: XConn>(conn: &X) -> Result<TrayAtoms> {
        let selection = format!("_NET_SYSTEM_TRAY_S{}", conn.preferred_screen());
        Ok(TrayAtoms {
            selection: conn.intern_atom(&selection)?,
            opcode: conn.intern_atom("_NET_SYSTEM_TRAY_OPCODE")?,
            manager: conn.intern_atom("MANAGER")?,
            orientation: conn.intern_atom("_NET_SYSTEM_TRAY_ORIENTATION")?,
            xembed: conn.intern_atom("_XEMBED")?,
            xembed_info: conn.intern_atom("_XEMBED_INFO")?,
        })
    }
}

/// An embedded icon and its place in the strip
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct TrayIcon {
    id: Window,
    region: Rectangle,
}

impl TrayIcon {
    pub fn id(&self) -> Window {
        self.id
    }

    pub fn region(&self) -> Rectangle {
        self.region
    }
}

pub struct Tray {
    win: Window,
    region: Rectangle,
    /// Most recently docked first
    icons: VecDeque<TrayIcon>,
    atoms: TrayAtoms,
    gap: u32,
}

impl Tray {
    /**
     * Claim the tray selection and put up the strip window.
     *
     * Returns `None` without touching the server if another client already
     * owns the selection, or after tidying up if we lose the race to claim it.
     */
    pub fn create<X: XConn>(
        conn: &X,
        atoms: TrayAtoms,
        region: Rectangle,
        background: u32,
        gap: u32,
    ) -> Option<Tray> {
        if let Some(owner) = conn.selection_owner(atoms.selection) {
            warn!("another system tray is running (window {}), continuing without one", owner);
            return None;
        }

        let win = conn.create_window(region, background, TRAY_EVENT_MASK);
        conn.set_selection_owner(atoms.selection, Some(win));
        if conn.selection_owner(atoms.selection) != Some(win) {
            warn!("could not acquire the system tray selection");
            conn.destroy_window(win);
            return None;
        }

        let root = conn.root();
        conn.send_client_message(
            root,
            root,
            atoms.manager,
            [CURRENT_TIME, atoms.selection, win, 0, 0],
            EVENT_MASK_STRUCTURE_NOTIFY,
        );
        conn.set_cardinal_property(win, atoms.orientation, SYSTEM_TRAY_ORIENTATION_HORZ);
        conn.map_window(win);
        conn.configure_window(win, None, None, true);
        conn.sync();

        info!("system tray running as window {}", win);
        Some(Tray {
            win,
            region,
            icons: VecDeque::new(),
            atoms,
            gap,
        })
    }

    pub fn window(&self) -> Window {
        self.win
    }

    pub fn region(&self) -> Rectangle {
        self.region
    }

    pub fn icons(&self) -> impl Iterator<Item = &TrayIcon> {
        self.icons.iter()
    }

    pub fn contains(&self, win: Window) -> bool {
        self.icons.iter().any(|i| i.id == win)
    }

    /// Icons are square, as tall as the strip
    fn icon_size(&self) -> u32 {
        self.region.h
    }

    /// Embed `win` into the strip
    pub fn add_icon<X: XConn>(&mut self, conn: &X, win: Window) {
        if self.contains(win) {
            return;
        }
        if conn.get_window_attributes(win).is_none() {
            warn!("unable to read attributes of tray icon {}, not docking it", win);
            return;
        }

        let size = self.icon_size();
        self.icons.push_front(TrayIcon {
            id: win,
            region: Rectangle::new(0, 0, size, size),
        });

        conn.register_events(win, TRAY_ICON_EVENT_MASK);
        conn.reparent_window(win, self.win, 0, 0);
        conn.send_client_message(
            win,
            win,
            self.atoms.xembed,
            [CURRENT_TIME, XEMBED_EMBEDDED_NOTIFY, 0, self.win, 0],
            EVENT_MASK_NO_EVENT,
        );
        conn.map_window(win);
        conn.configure_window(win, None, None, true);
        debug!("docked tray icon {}", win);

        self.relayout(conn);
    }

    /// Hand `win` back to the root window. False if it was never docked.
    pub fn remove_icon<X: XConn>(&mut self, conn: &X, win: Window) -> bool {
        let pos = match self.icons.iter().position(|i| i.id == win) {
            Some(pos) => pos,
            None => return false,
        };
        self.icons.remove(pos);

        conn.unmap_window(win);
        conn.reparent_window(win, conn.root(), 0, 0);
        debug!("undocked tray icon {}", win);

        self.relayout(conn);
        true
    }

    pub fn relayout<X: XConn>(&mut self, conn: &X) {
        let size = self.icon_size();
        let mut x = 0;
        for icon in self.icons.iter_mut() {
            icon.region = Rectangle::new(x, 0, size, size);
            conn.configure_window(icon.id, Some(icon.region), None, false);
            x += (size + self.gap) as i32;
        }
        conn.sync();
    }

    /// Release every icon, give up the selection and remove the strip
    pub fn destroy<X: XConn>(self, conn: &X) {
        let root = conn.root();
        for icon in self.icons.iter() {
            conn.unmap_window(icon.id);
            conn.reparent_window(icon.id, root, 0, 0);
        }
        conn.set_selection_owner(self.atoms.selection, None);
        conn.destroy_window(self.win);
        info!("system tray shut down");
    }
}
