use anyhow::{Result, Context};
use xcb::{Window, Atom};

use crate::{
    bindings::{self, Action, Bindings},
    client::{Client, ClientId},
    config::Config,
    focus::{self, BorderColors},
    layout::{find_layout, LayoutKind, Placement},
    monitor::Monitor,
    tray::{Tray, TrayAtoms, SYSTEM_TRAY_REQUEST_DOCK},
    xconnection::{
        XConn, XEvent, XcbKey, Rectangle, ConfigureRequest, CrossingMode, CrossingDetail, MapState,
    },
};

/**
 * The window manager: one monitor of tiled clients, the key bindings that
 * drive it and an optional system tray.
 *
 * All state changes happen in response to a single X event at a time, so a
 * handler always leaves the monitor consistent before the next event is read.
 */
pub struct WindowManager<'a, X: XConn> {
    conn: &'a X,
    config: Config,
    colors: BorderColors,
    monitor: Monitor,
    bindings: Bindings,
    tray: Option<Tray>,
    tray_atoms: TrayAtoms,
    running: bool,
}

impl<'a, X: XConn> WindowManager<'a, X> {
    /// Take over the display: failing to become the window manager, to resolve
    /// a border color or to parse a key binding is fatal. A missing tray is not.
    pub fn new(conn: &'a X, config: Config) -> Result<Self> {
        conn.register_wm()?;

        let colors = BorderColors {
            normal: conn.resolve_color(&config.unfocused_border_color)?,
            focused: conn.resolve_color(&config.focused_border_color)?,
        };
        let tray_background = conn.resolve_color(&config.tray_background)?;

        let bindings = Bindings::new(&config.key_bindings).context("Invalid key binding")?;
        bindings.grab_keys(conn);

        let tray_atoms = TrayAtoms::intern(conn).context("Failed to intern tray atoms")?;

        let screen = conn.screen_region();
        let monitor_region = Rectangle::new(
            screen.x,
            screen.y,
            screen.w,
            screen.h.saturating_sub(config.tray_height),
        );
        let tray_width = config.tray_width.min(screen.w);
        let tray_region = Rectangle::new(
            screen.x + (screen.w - tray_width) as i32,
            screen.y + monitor_region.h as i32,
            tray_width,
            config.tray_height,
        );
        let tray = Tray::create(conn, tray_atoms, tray_region, tray_background, config.tray_icon_gap);
        let monitor = Monitor::new(monitor_region, config.master_factor, config.num_master);

        let mut wm = WindowManager {
            conn,
            config,
            colors,
            monitor,
            bindings,
            tray,
            tray_atoms,
            running: false,
        };

        wm.scan();
        wm.conn.flush();
        info!("window manager initialised on a {}x{} monitor", monitor_region.w, monitor_region.h);

        Ok(wm)
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn tray(&self) -> Option<&Tray> {
        self.tray.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn active_layout(&self) -> Option<LayoutKind> {
        self.config.layouts.get(self.monitor.layout()).map(|l| l.kind)
    }

    // Adopt windows that were already there before we started
    fn scan(&mut self) {
        for win in self.conn.query_tree() {
            let attrs = match self.conn.get_window_attributes(win) {
                Some(attrs) => attrs,
                None => continue,
            };
            if attrs.override_redirect
                || attrs.map_state == MapState::Unviewable
                || self.conn.is_transient(win)
            {
                continue;
            }
            if self.conn.has_property(win, self.tray_atoms.xembed_info) {
                if let Some(tray) = self.tray.as_mut() {
                    tray.add_icon(self.conn, win);
                }
                continue;
            }

            if let Some(client) = Client::create(self.conn, win, self.config.border_width_px, self.colors.normal) {
                let id = self.monitor.attach(client);
                if let Some(c) = self.monitor.client_mut(id) {
                    c.mapped = attrs.map_state == MapState::Viewable;
                }
                info!("adopted existing window {}", win);
            }
        }
        self.apply_layout();
    }

    /// Process events until a quit action is run or the connection is lost
    pub fn run(&mut self) -> Result<()> {
        info!("entering event loop");
        self.running = true;
        while self.running {
            if let Some(event) = self.conn.wait_for_event()? {
                debug!("got XEvent: {:?}", event);
                self.handle_event(event);
            }
            self.conn.flush();
        }
        info!("event loop finished");
        Ok(())
    }

    /// Stop the event loop once the current event has been handled
    pub fn exit(&mut self) {
        info!("quit requested");
        self.running = false;
    }

    /// Release every client, tear down the tray and hand input back to the server
    pub fn cleanup(&mut self) {
        while let Some(id) = self.monitor.clients().head() {
            if let Some(c) = self.monitor.client(id).filter(|c| !c.mapped) {
                self.conn.map_window(c.id());
            }
            if self.remove_client(id).is_none() {
                break;
            }
        }
        if let Some(tray) = self.tray.take() {
            tray.destroy(self.conn);
        }
        self.conn.cleanup();
    }

    pub fn handle_event(&mut self, event: XEvent) {
        match event {
            XEvent::ConfigureRequest(req) => self.handle_configure_request(&req),
            XEvent::MapRequest { id } => self.handle_map_request(id),
            XEvent::UnmapNotify { id, parent } => self.handle_unmap_notify(id, parent),
            XEvent::DestroyNotify { id } => self.handle_destroy_notify(id),
            XEvent::EnterNotify { id, mode, detail } => self.handle_enter_notify(id, mode, detail),
            XEvent::KeyPress { key } => self.handle_key_press(key),
            XEvent::ButtonPress { id, child } => self.handle_button_press(id, child),
            XEvent::ClientMessage { id, message_type, data } => {
                self.handle_client_message(id, message_type, data)
            }
        }
    }

    /*
     * X Event handler functions
     * These are called in response to incoming XEvents so calling them directly should
     * only be done if the intent is to act as if the corresponding XEvent had been
     * received from the X event loop
     */

    // Initial placement is left entirely to the client
    fn handle_configure_request(&self, req: &ConfigureRequest) {
        self.conn.pass_configure_request(req);
        self.conn.sync();
    }

    fn handle_map_request(&mut self, win: Window) {
        let attrs = match self.conn.get_window_attributes(win) {
            Some(attrs) => attrs,
            None => {
                warn!("unable to read attributes of window {}, ignoring map request", win);
                return;
            }
        };
        if attrs.override_redirect || self.monitor.find(win).is_some() {
            return;
        }

        if self.conn.has_property(win, self.tray_atoms.xembed_info) {
            match self.tray.as_mut() {
                Some(tray) => tray.add_icon(self.conn, win),
                None => debug!("no tray to dock window {} into", win),
            }
            return;
        }

        let client = match Client::create(self.conn, win, self.config.border_width_px, self.colors.normal) {
            Some(c) => c,
            None => return,
        };
        let id = self.monitor.attach(client);
        self.conn.map_window(win);
        if let Some(c) = self.monitor.client_mut(id) {
            c.mapped = true;
        }
        info!("managing window {}", win);

        focus::focus(self.conn, &mut self.monitor, self.colors, Some(id));
        self.apply_layout();
    }

    // Docking reparents an icon, and the unmap that causes is reported on root
    fn handle_unmap_notify(&mut self, win: Window, parent: Window) {
        if let Some(id) = self.monitor.find(win) {
            if let Some(c) = self.monitor.client_mut(id) {
                if c.pending_unmaps > 0 {
                    c.pending_unmaps -= 1;
                    return;
                }
            }
            self.unmanage(id);
        } else if let Some(tray) = self.tray.as_mut().filter(|t| t.window() == parent) {
            tray.remove_icon(self.conn, win);
        }
    }

    fn handle_destroy_notify(&mut self, win: Window) {
        if let Some(id) = self.monitor.find(win) {
            self.unmanage(id);
        } else if let Some(tray) = self.tray.as_mut() {
            tray.remove_icon(self.conn, win);
        }
    }

    fn handle_enter_notify(&mut self, win: Window, mode: CrossingMode, detail: CrossingDetail) {
        if !focus::focus_follows_crossing(mode, detail) {
            return;
        }
        if let Some(id) = self.monitor.find(win) {
            focus::focus(self.conn, &mut self.monitor, self.colors, Some(id));
        }
    }

    fn handle_key_press(&mut self, key: XcbKey) {
        let (action, arg) = match self.bindings.get_action(&key) {
            Some((action, arg)) => (action, arg.map(String::from)),
            None => return,
        };
        debug!("running {:?} for key {:?}", action, key);
        self.run_action(action, arg.as_deref());
    }

    // The pointer may be over a child of the window the click was reported on
    fn handle_button_press(&mut self, win: Window, child: Window) {
        let id = self
            .monitor
            .find(win)
            .or_else(|| Some(child).filter(|&c| c != xcb::NONE).and_then(|c| self.monitor.find(c)));
        if id.is_some() {
            focus::focus(self.conn, &mut self.monitor, self.colors, id);
        }
    }

    fn handle_client_message(&mut self, win: Window, message_type: Atom, data: [u32; 5]) {
        if message_type != self.tray_atoms.opcode {
            return;
        }
        if data[1] != SYSTEM_TRAY_REQUEST_DOCK {
            debug!("ignoring system tray opcode {} from window {}", data[1], win);
            return;
        }
        if let Some(tray) = self.tray.as_mut() {
            tray.add_icon(self.conn, data[2]);
        }
    }

    /// Run a key binding action with its optional argument
    pub fn run_action(&mut self, action: Action, arg: Option<&str>) {
        match action {
            Action::Spawn => match arg {
                Some(cmd) => bindings::spawn(cmd),
                None => warn!("spawn bound without a command"),
            },
            Action::KillClient => self.kill_focused(),
            Action::Quit => self.exit(),
            Action::FocusNext => self.focus_next(),
            Action::FocusPrev => self.focus_prev(),
            Action::ToggleFloating => self.toggle_floating(),
            Action::ToggleFullscreen => self.toggle_fullscreen(),
            Action::SetMasterFactor => self.set_master_factor(arg),
            Action::IncNumMaster => {
                self.monitor.inc_num_master();
                self.apply_layout();
            }
            Action::DecNumMaster => {
                self.monitor.dec_num_master();
                self.apply_layout();
            }
            Action::SetLayout => match arg {
                Some(name) => self.set_layout(name),
                None => warn!("set_layout bound without a layout name"),
            },
        }
    }

    /// Move focus one step towards the tail of the list. Stops at the tail.
    pub fn focus_next(&mut self) {
        let next = focus::next_client(&self.monitor);
        self.reveal_and_focus(next);
    }

    /// Move focus one step towards the head of the list. Stops at the head.
    pub fn focus_prev(&mut self) {
        let prev = focus::prev_client(&self.monitor);
        self.reveal_and_focus(prev);
    }

    // Monocle only shows the selection, and a window has to be viewable
    // before it can take input focus
    fn reveal_and_focus(&mut self, id: Option<ClientId>) {
        let id = match id {
            Some(id) => id,
            None => return,
        };
        if self.active_layout() == Some(LayoutKind::Monocle) {
            let prev = self.monitor.selected();
            self.monitor.set_selected(Some(id));
            self.apply_layout();
            self.monitor.set_selected(prev);
        }
        focus::focus(self.conn, &mut self.monitor, self.colors, Some(id));
    }

    /// Kill the focused window.
    pub fn kill_focused(&mut self) {
        if let Some(win) = self.monitor.selected_window() {
            self.conn.signal_delete_window(win);
        }
    }

    pub fn set_layout(&mut self, name: &str) {
        match find_layout(&self.config.layouts, name) {
            Some(index) => {
                info!("switching to layout '{}'", name);
                self.monitor.set_layout(index);
                self.apply_layout();
            }
            None => warn!("no layout named '{}'", name),
        }
    }

    fn set_master_factor(&mut self, arg: Option<&str>) {
        let delta = match arg.map(|a| a.trim().parse::<f32>()) {
            Some(Ok(delta)) => delta,
            _ => {
                warn!("invalid master factor adjustment {:?}", arg);
                return;
            }
        };
        if self.monitor.set_master_factor(delta) {
            self.apply_layout();
        } else {
            debug!("master factor adjustment {} out of range, ignored", delta);
        }
    }

    /// Float or sink the selection. Floating restores the geometry it had
    /// before it was tiled; sinking remembers where it floated.
    pub fn toggle_floating(&mut self) {
        let id = match self.monitor.selected() {
            Some(id) => id,
            None => return,
        };
        let restore = match self.monitor.client_mut(id) {
            Some(c) => {
                c.floating = !c.floating;
                if c.floating {
                    Some(c.saved_geometry())
                } else {
                    c.save_geometry();
                    None
                }
            }
            None => return,
        };
        if let Some(r) = restore {
            self.resize(id, r);
        }
        self.apply_layout();
    }

    pub fn toggle_fullscreen(&mut self) {
        let id = match self.monitor.selected() {
            Some(id) => id,
            None => return,
        };
        let entering = match self.monitor.client_mut(id) {
            Some(c) => {
                c.fullscreen = !c.fullscreen;
                if c.fullscreen {
                    c.save_geometry();
                }
                c.fullscreen
            }
            None => return,
        };

        if entering {
            let region = self.monitor.region();
            self.resize(id, region);
            self.raise(id);
        } else {
            if let Some(saved) = self.monitor.client(id).map(|c| c.saved_geometry()) {
                self.resize(id, saved);
            }
            self.apply_layout();
        }
    }

    /**
     * Reflow the monitor.
     *
     * Fullscreen clients cover the whole monitor and sit on top whatever the
     * active layout is. Everything else is handed to the layout, and the
     * server is synced before returning.
     */
    pub fn apply_layout(&mut self) {
        let region = self.monitor.region();
        let fullscreen: Vec<ClientId> = self
            .monitor
            .clients()
            .ids()
            .filter(|&id| self.monitor.client(id).map(|c| c.is_fullscreen()).unwrap_or(false))
            .collect();
        for id in fullscreen {
            self.resize(id, region);
            self.show(id);
            self.raise(id);
        }

        if let Some(kind) = self.active_layout() {
            for (id, placement) in kind.arrange(&self.monitor, self.config.border_width_px) {
                match placement {
                    Placement::Tiled(r) => {
                        self.resize(id, r);
                        self.show(id);
                    }
                    Placement::Shown => self.show(id),
                    Placement::Hidden => self.hide(id),
                }
            }
        }

        self.conn.sync();
    }

    fn resize(&mut self, id: ClientId, r: Rectangle) {
        let border = self.config.border_width_px;
        if let Some(c) = self.monitor.client_mut(id) {
            c.set_geometry(r);
            self.conn.configure_window(c.id(), Some(r), None, false);
            self.conn.send_configure_notify(c.id(), r, border);
        }
    }

    fn raise(&self, id: ClientId) {
        if let Some(c) = self.monitor.client(id) {
            self.conn.configure_window(c.id(), None, None, true);
        }
    }

    fn show(&mut self, id: ClientId) {
        if let Some(c) = self.monitor.client_mut(id) {
            if !c.mapped {
                c.mapped = true;
                self.conn.map_window(c.id());
            }
        }
    }

    // The unmap notification we are about to cause must not unmanage the client
    fn hide(&mut self, id: ClientId) {
        if let Some(c) = self.monitor.client_mut(id) {
            if c.mapped {
                c.mapped = false;
                c.pending_unmaps += 1;
                self.conn.unmap_window(c.id());
            }
        }
    }

    /// Stop managing a client and reflow. If it held the selection, focus
    /// passes to the new head of the list once that is on screen.
    fn unmanage(&mut self, id: ClientId) {
        let selection_changed = match self.remove_client(id) {
            Some(changed) => changed,
            None => return,
        };
        self.apply_layout();
        if selection_changed {
            match self.monitor.selected() {
                Some(next) => {
                    focus::focus(self.conn, &mut self.monitor, self.colors, Some(next));
                }
                None => self.conn.focus_nothing(),
            }
        }
    }

    /// Drop `id` from the monitor. Whether the selection moved, or None if
    /// `id` was not managed.
    fn remove_client(&mut self, id: ClientId) -> Option<bool> {
        let (client, selection_changed) = self.monitor.remove(id)?;
        debug!("removed client {}", client.id());
        Some(selection_changed)
    }
}
