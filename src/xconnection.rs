use std::collections::HashMap;

use anyhow::{Result, Context, anyhow};

use xcb::{Window, Atom, Keysym};
use xcb_util::{ewmh, icccm, keysyms::KeySymbols};

// Mask out the most significant bit, which indicates if it's a send_event
// Bit mask to find event type regardless of event source.
// Each event in the X11 protocol contains an 8-bit type code. The most-significant bit in this code is set if the event was generated from a SendEvent request. This mask can be used to determine the type of event regardless of how the event was generated. See the X11R6 protocol specification for details.
const XCB_RESPONSE_TYPE_MASK: u8 = 0x7F;
const GRAB_MODE_ASYNC: u8 = xcb::GRAB_MODE_ASYNC as u8;
const ROOT_EVENT_MASK: &[(u32, u32)] = &[(
    xcb::CW_EVENT_MASK,
    xcb::EVENT_MASK_SUBSTRUCTURE_REDIRECT
        | xcb::EVENT_MASK_SUBSTRUCTURE_NOTIFY
        | xcb::EVENT_MASK_BUTTON_PRESS
        | xcb::EVENT_MASK_ENTER_WINDOW
        | xcb::EVENT_MASK_LEAVE_WINDOW
        | xcb::EVENT_MASK_STRUCTURE_NOTIFY
        | xcb::EVENT_MASK_PROPERTY_CHANGE,
)];

/// Events selected on every managed client window
pub const CLIENT_EVENT_MASK: u32 = xcb::EVENT_MASK_ENTER_WINDOW
    | xcb::EVENT_MASK_FOCUS_CHANGE
    | xcb::EVENT_MASK_PROPERTY_CHANGE
    | xcb::EVENT_MASK_STRUCTURE_NOTIFY;
/// Events selected on an embedded tray icon
pub const TRAY_ICON_EVENT_MASK: u32 =
    xcb::EVENT_MASK_STRUCTURE_NOTIFY | xcb::EVENT_MASK_PROPERTY_CHANGE;
/// Events selected on the tray strip itself. Substructure notifications are
/// how unmaps and destroys of embedded icons reach the manager.
pub const TRAY_EVENT_MASK: u32 = xcb::EVENT_MASK_BUTTON_PRESS
    | xcb::EVENT_MASK_EXPOSURE
    | xcb::EVENT_MASK_SUBSTRUCTURE_NOTIFY;
pub const EVENT_MASK_NO_EVENT: u32 = xcb::EVENT_MASK_NO_EVENT;
pub const EVENT_MASK_STRUCTURE_NOTIFY: u32 = xcb::EVENT_MASK_STRUCTURE_NOTIFY;

const INPUT_FOCUS_POINTER_ROOT: u8 = xcb::INPUT_FOCUS_POINTER_ROOT as u8;
const PROP_MODE_REPLACE: u8 = xcb::PROP_MODE_REPLACE as u8;
const WINDOW_CLASS_INPUT_OUTPUT: u16 = xcb::WINDOW_CLASS_INPUT_OUTPUT as u16;
const COPY_FROM_PARENT: u8 = xcb::COPY_FROM_PARENT as u8;

const CONFIG_WINDOW_BORDER_WIDTH: u16 = xcb::CONFIG_WINDOW_BORDER_WIDTH as u16;
const CONFIG_WINDOW_HEIGHT: u16 = xcb::CONFIG_WINDOW_HEIGHT as u16;
const CONFIG_WINDOW_WIDTH: u16 = xcb::CONFIG_WINDOW_WIDTH as u16;
const CONFIG_WINDOW_X: u16 = xcb::CONFIG_WINDOW_X as u16;
const CONFIG_WINDOW_Y: u16 = xcb::CONFIG_WINDOW_Y as u16;
const CONFIG_WINDOW_SIBLING: u16 = xcb::CONFIG_WINDOW_SIBLING as u16;
const CONFIG_WINDOW_STACK_MODE: u16 = xcb::CONFIG_WINDOW_STACK_MODE as u16;
const CONFIG_WINDOW_STACK_ABOVE: u32 = xcb::STACK_MODE_ABOVE as u32;

/// NumLock and CapsLock: grabbed as variants of every binding and ignored when matching
pub const LOCK_MASKS: u16 = (xcb::MOD_MASK_LOCK | xcb::MOD_MASK_2) as u16;

macro_rules! atoms {
    ( $( $name:ident ),+ ) => {
        #[allow(non_snake_case)]
        pub struct InternedAtoms {
            $(
                pub $name: xcb::Atom
            ),*
        }

        impl InternedAtoms {
            pub fn new(conn: &xcb::Connection) -> Result<InternedAtoms> {
                Ok(InternedAtoms {
                    $(
                        $name: xcb::intern_atom(conn, false, stringify!($name)).get_reply()?.atom()
                    ),*
                })
            }
        }
    };
    // Allow trailing comma:
    ( $( $name:ident ),+ , ) => (atoms!($( $name ),+);)
}

// Intern atoms that are not built-in in icccm or ewmh
atoms!(WM_DELETE_WINDOW);

/// An X keysym along with a modifier mask
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct XcbKey {
    /// Modifier key bit mask, with the lock modifiers cleared
    pub mod_mask: u16,
    /// Keysym found in the first column of the keyboard mapping
    pub keysym: Keysym,
}

impl XcbKey {
    pub fn new(mod_mask: u16, keysym: Keysym) -> XcbKey {
        XcbKey {
            mod_mask: mod_mask & !LOCK_MASKS,
            keysym,
        }
    }
}

/// An X window / screen position: top left corner + extent
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rectangle {
    /// Create a new Rectangle.
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
        Rectangle { x, y, w, h }
    }

    /// Destructure this Rectangle into its component values (x, y, w, h).
    pub fn values(&self) -> (i32, i32, u32, u32) {
        (self.x, self.y, self.w, self.h)
    }

    /// Shrink the extent to leave room for a border of `border` pixels on every side.
    pub fn inside_border(&self, border: u32) -> Rectangle {
        Rectangle {
            x: self.x,
            y: self.y,
            w: self.w.saturating_sub(2 * border),
            h: self.h.saturating_sub(2 * border),
        }
    }
}

/// Why the pointer crossed into a window
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CrossingMode {
    Normal,
    Grab,
    Ungrab,
    WhileGrabbed,
}

impl CrossingMode {
    fn from_raw(mode: u8) -> CrossingMode {
        match mode as u32 {
            xcb::NOTIFY_MODE_NORMAL => CrossingMode::Normal,
            xcb::NOTIFY_MODE_GRAB => CrossingMode::Grab,
            xcb::NOTIFY_MODE_UNGRAB => CrossingMode::Ungrab,
            _ => CrossingMode::WhileGrabbed,
        }
    }
}

/// Where the pointer came from relative to the window it entered
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CrossingDetail {
    Ancestor,
    Virtual,
    Inferior,
    Nonlinear,
    NonlinearVirtual,
    Pointer,
    PointerRoot,
    None,
}

impl CrossingDetail {
    fn from_raw(detail: u8) -> CrossingDetail {
        match detail as u32 {
            xcb::NOTIFY_DETAIL_ANCESTOR => CrossingDetail::Ancestor,
            xcb::NOTIFY_DETAIL_VIRTUAL => CrossingDetail::Virtual,
            xcb::NOTIFY_DETAIL_INFERIOR => CrossingDetail::Inferior,
            xcb::NOTIFY_DETAIL_NONLINEAR => CrossingDetail::Nonlinear,
            xcb::NOTIFY_DETAIL_NONLINEAR_VIRTUAL => CrossingDetail::NonlinearVirtual,
            xcb::NOTIFY_DETAIL_POINTER => CrossingDetail::Pointer,
            xcb::NOTIFY_DETAIL_POINTER_ROOT => CrossingDetail::PointerRoot,
            _ => CrossingDetail::None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MapState {
    Unmapped,
    Unviewable,
    Viewable,
}

/// The subset of window attributes the manager cares about
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct WindowAttributes {
    pub override_redirect: bool,
    pub map_state: MapState,
}

/// A configure request as sent by the client: only the fields flagged in
/// `value_mask` were actually requested.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ConfigureRequest {
    pub window: Window,
    pub value_mask: u16,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub sibling: Window,
    pub stack_mode: u8,
}

/**
 * Wrapper around the low level XCB event types that require casting to work with.
 * Not all event fields are extracted so check the XCB documentation and update
 * accordingly if you need access to something that isn't currently passed through
 * to the WindowManager event loop.
 *
 * https://tronche.com/gui/x/xlib/events/types.html
 * https://github.com/rtbo/rust-xcb/xml/xproto.xml
 */
#[derive(Debug, Clone, PartialEq)]
pub enum XEvent {
    /// xcb docs: https://www.mankier.com/3/xcb_configure_request_event_t
    ConfigureRequest(ConfigureRequest),

    /// xcb docs: https://www.mankier.com/3/xcb_map_request_event_t
    MapRequest {
        /// The ID of the window that wants to be mapped
        id: Window,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_unmap_notify_event_t
    UnmapNotify {
        /// The ID of the window that was unmapped
        id: Window,
        /// The parent the notification was reported on: root or the tray strip
        parent: Window,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_destroy_notify_event_t
    DestroyNotify {
        /// The ID of the window being destroyed
        id: Window,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_enter_notify_event_t
    EnterNotify {
        /// The ID of the window that was entered
        id: Window,
        mode: CrossingMode,
        detail: CrossingDetail,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_key_press_event_t
    KeyPress {
        /// The keysym that was received along with any modifiers that were held
        key: XcbKey,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_button_press_event_t
    ButtonPress {
        /// The window the event was reported on
        id: Window,
        /// The child of `id` containing the pointer, if any
        child: Window,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_client_message_event_t
    ClientMessage {
        /// The window the message is about
        id: Window,
        /// Type of the message
        message_type: Atom,
        /// Payload as 32-bit words
        data: [u32; 5],
    },
}

/// Every request the window manager makes of the X server.
///
/// Implemented by [XcbConnection] for real displays and by a recording mock in tests.
pub trait XConn {
    fn root(&self) -> Window;
    fn preferred_screen(&self) -> i32;
    /// The full extent of the preferred screen
    fn screen_region(&self) -> Rectangle;

    fn flush(&self) -> bool;
    /// Flush and wait for the server to process everything sent so far
    fn sync(&self);
    /// Block for the next event. `Ok(None)` is returned for event kinds the
    /// manager does not handle and `Err` once the connection is gone.
    fn wait_for_event(&self) -> Result<Option<XEvent>>;

    fn register_wm(&self) -> Result<()>;
    fn intern_atom(&self, atom_name: &str) -> Result<Atom>;
    /// Resolve `#rrggbb` or a server-known color name into a pixel value
    fn resolve_color(&self, color: &str) -> Result<u32>;
    fn grab_key(&self, key: &XcbKey);

    fn query_tree(&self) -> Vec<Window>;
    fn get_window_attributes(&self, win: Window) -> Option<WindowAttributes>;
    fn get_geometry(&self, win: Window) -> Option<Rectangle>;
    /// True when the property exists on the window; fetch failures count as absent.
    fn has_property(&self, win: Window, atom: Atom) -> bool;
    fn is_transient(&self, win: Window) -> bool;

    fn register_events(&self, win: Window, events: u32);
    fn configure_window(&self, win: Window, region: Option<Rectangle>, border_width: Option<u32>, stack_above: bool);
    fn pass_configure_request(&self, req: &ConfigureRequest);
    fn send_configure_notify(&self, win: Window, region: Rectangle, border_width: u32);
    fn set_window_border_color(&self, win: Window, color: u32);
    fn focus_window(&self, win: Window);
    fn focus_nothing(&self);
    fn map_window(&self, win: Window);
    fn unmap_window(&self, win: Window);
    fn reparent_window(&self, win: Window, parent: Window, x: i16, y: i16);
    /// Create an override-redirect child of the root
    fn create_window(&self, region: Rectangle, background: u32, events: u32) -> Window;
    fn destroy_window(&self, win: Window);

    fn selection_owner(&self, selection: Atom) -> Option<Window>;
    fn set_selection_owner(&self, selection: Atom, owner: Option<Window>);
    fn send_client_message(&self, dest: Window, win: Window, message_type: Atom, data: [u32; 5], event_mask: u32);
    fn set_cardinal_property(&self, win: Window, property: Atom, value: u32);

    /// Closes a window, gracefully if it supports WM_DELETE_WINDOW.
    fn signal_delete_window(&self, win: Window);
    /// Release grabs and focus before the manager exits
    fn cleanup(&self);
}

/// Unshifted keysym of every keycode, read once at startup so key presses
/// decode without a round trip
#[derive(Debug, Default)]
pub struct KeyboardMap {
    keysyms: HashMap<xcb::Keycode, Keysym>,
}

impl KeyboardMap {
    pub fn new<F>(min: xcb::Keycode, max: xcb::Keycode, lookup: F) -> KeyboardMap
    where
        F: Fn(xcb::Keycode) -> Keysym,
    {
        KeyboardMap {
            keysyms: (min..=max).map(|code| (code, lookup(code))).collect(),
        }
    }

    /// NoSymbol for codes outside the server's range
    pub fn keysym(&self, code: xcb::Keycode) -> Keysym {
        self.keysyms.get(&code).copied().unwrap_or(0)
    }
}

/// Handles communication with an X server via xcb
pub struct XcbConnection {
    conn: ewmh::Connection,
    preferred_screen: i32,
    root: Window,
    region: Rectangle,
    colormap: xcb::Colormap,
    root_visual: xcb::Visualid,
    atoms: InternedAtoms,
    keyboard: KeyboardMap,
}

impl XcbConnection {
    pub fn new() -> Result<XcbConnection> {
        let (conn, preferred_screen) = xcb::Connection::connect(None)
            .context("Unable to connection to X server")?;
        let conn = ewmh::Connection::connect(conn).map_err(|(e, _)| e)?;

        let (root, region, colormap, root_visual) = {
            let screen = conn
                .get_setup()
                .roots()
                .nth(preferred_screen as usize)
                .context("Unable to get the root window of the preferred screen")?;
            (
                screen.root(),
                Rectangle::new(0, 0, screen.width_in_pixels() as u32, screen.height_in_pixels() as u32),
                screen.default_colormap(),
                screen.root_visual(),
            )
        };

        let atoms = InternedAtoms::new(&conn).context("Failed to intern atoms")?;

        let keyboard = {
            let setup = conn.get_setup();
            let keysyms = KeySymbols::new(&conn);
            KeyboardMap::new(setup.min_keycode(), setup.max_keycode(), |code| keysyms.get_keysym(code, 0))
        };

        Ok(XcbConnection {
            conn,
            preferred_screen,
            root,
            region,
            colormap,
            root_visual,
            atoms,
            keyboard,
        })
    }

    /// Queries the WM_PROTOCOLS property of a window, returning a list of the
    /// protocols that it supports.
    fn get_wm_protocols(&self, id: Window) -> Result<Vec<xcb::Atom>> {
        let reply = icccm::get_wm_protocols(&self.conn, id, self.conn.WM_PROTOCOLS())
            .get_reply()?;
        Ok(reply.atoms().to_vec())
    }
}

impl XConn for XcbConnection {
    fn root(&self) -> Window {
        self.root
    }

    fn preferred_screen(&self) -> i32 {
        self.preferred_screen
    }

    fn screen_region(&self) -> Rectangle {
        self.region
    }

    fn flush(&self) -> bool {
        self.conn.flush()
    }

    fn sync(&self) {
        // a round trip guarantees every earlier request has been handled
        if let Err(e) = xcb::get_input_focus(&self.conn).get_reply() {
            warn!("sync with X server failed: error code {}", e.error_code());
        }
    }

    fn wait_for_event(&self) -> Result<Option<XEvent>> {
        let event = self
            .conn
            .wait_for_event()
            .ok_or_else(|| anyhow!("Lost the connection to the X server"))?;
        let etype = event.response_type() & XCB_RESPONSE_TYPE_MASK;

        // Each window also reports its own structure changes; only the copy
        // delivered to the parent (root or tray) is kept.
        let event = match etype {
            xcb::CONFIGURE_REQUEST => {
                let e: &xcb::ConfigureRequestEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::ConfigureRequest(ConfigureRequest {
                    window: e.window(),
                    value_mask: e.value_mask(),
                    x: e.x(),
                    y: e.y(),
                    width: e.width(),
                    height: e.height(),
                    border_width: e.border_width(),
                    sibling: e.sibling(),
                    stack_mode: e.stack_mode(),
                }))
            }

            xcb::MAP_REQUEST => {
                let e: &xcb::MapRequestEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::MapRequest { id: e.window() })
            }

            xcb::UNMAP_NOTIFY => {
                let e: &xcb::UnmapNotifyEvent = unsafe { xcb::cast_event(&event) };
                if e.event() == e.window() {
                    None
                } else {
                    Some(XEvent::UnmapNotify { id: e.window(), parent: e.event() })
                }
            }

            xcb::DESTROY_NOTIFY => {
                let e: &xcb::DestroyNotifyEvent = unsafe { xcb::cast_event(&event) };
                if e.event() == e.window() {
                    None
                } else {
                    Some(XEvent::DestroyNotify { id: e.window() })
                }
            }

            xcb::ENTER_NOTIFY => {
                let e: &xcb::EnterNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::EnterNotify {
                    id: e.event(),
                    mode: CrossingMode::from_raw(e.mode()),
                    detail: CrossingDetail::from_raw(e.detail()),
                })
            }

            xcb::KEY_PRESS => {
                let e: &xcb::KeyPressEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::KeyPress {
                    key: XcbKey::new(e.state(), self.keyboard.keysym(e.detail())),
                })
            }

            xcb::BUTTON_PRESS => {
                let e: &xcb::ButtonPressEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::ButtonPress {
                    id: e.event(),
                    child: e.child(),
                })
            }

            xcb::CLIENT_MESSAGE => {
                let e: &xcb::ClientMessageEvent = unsafe { xcb::cast_event(&event) };
                if e.format() != 32 {
                    None
                } else {
                    let mut data: [u32; 5] = [0; 5];
                    data.copy_from_slice(e.data().data32());
                    Some(XEvent::ClientMessage {
                        id: e.window(),
                        message_type: e.type_(),
                        data,
                    })
                }
            }

            // NOTE: ignoring other event types
            _ => None,
        };
        Ok(event)
    }

    fn register_wm(&self) -> Result<()> {
        // Register for substructure redirection
        // https://jichu4n.com/posts/how-x-window-managers-work-and-how-to-write-one-part-i/#substructure-redirection
        xcb::change_window_attributes_checked(&self.conn, self.root, ROOT_EVENT_MASK)
            .request_check()
            .context("Could not register SUBSTRUCTURE_NOTIFY/REDIRECT, is another window manager running?")?;
        Ok(())
    }

    /// Returns the Atom identifier associated with the atom_name str.
    fn intern_atom(&self, atom_name: &str) -> Result<Atom> {
        Ok(xcb::intern_atom(&self.conn, false, atom_name).get_reply()?.atom())
    }

    fn resolve_color(&self, color: &str) -> Result<u32> {
        let pixel = match crate::config::parse_hex_color(color) {
            Some((r, g, b)) => xcb::alloc_color(
                &self.conn,
                self.colormap,
                u16::from(r) * 0x101,
                u16::from(g) * 0x101,
                u16::from(b) * 0x101,
            )
            .get_reply()
            .map(|r| r.pixel()),
            None => xcb::alloc_named_color(&self.conn, self.colormap, color)
                .get_reply()
                .map(|r| r.pixel()),
        };
        pixel.with_context(|| format!("Cannot allocate color {}", color))
    }

    fn grab_key(&self, key: &XcbKey) {
        let keysyms = KeySymbols::new(&self.conn);
        for code in keysyms.get_keycode(key.keysym) {
            for &locks in &[0, xcb::MOD_MASK_LOCK as u16, xcb::MOD_MASK_2 as u16, LOCK_MASKS] {
                // xcb docs: https://www.mankier.com/3/xcb_grab_key
                xcb::grab_key(
                    &self.conn,             // xcb connection to X11
                    true,                   // report grabbed events against the focused window
                    self.root,              // the window to grab: in this case the root window
                    key.mod_mask | locks,   // modifiers to grab
                    code,                   // keycode to grab
                    GRAB_MODE_ASYNC,        // don't lock pointer input while grabbing
                    GRAB_MODE_ASYNC,        // don't lock keyboard input while grabbing
                );
            }
        }
        self.conn.flush();
    }

    fn query_tree(&self) -> Vec<Window> {
        match xcb::query_tree(&self.conn, self.root).get_reply() {
            Ok(reply) => reply.children().to_vec(),
            Err(e) => {
                warn!("unable to query the window tree: error code {}", e.error_code());
                vec![]
            }
        }
    }

    fn get_window_attributes(&self, win: Window) -> Option<WindowAttributes> {
        let reply = xcb::get_window_attributes(&self.conn, win).get_reply().ok()?;
        let map_state = match reply.map_state() as u32 {
            xcb::MAP_STATE_VIEWABLE => MapState::Viewable,
            xcb::MAP_STATE_UNVIEWABLE => MapState::Unviewable,
            _ => MapState::Unmapped,
        };
        Some(WindowAttributes {
            override_redirect: reply.override_redirect(),
            map_state,
        })
    }

    fn get_geometry(&self, win: Window) -> Option<Rectangle> {
        xcb::get_geometry(&self.conn, win)
            .get_reply()
            .ok()
            .map(|g| Rectangle::new(g.x() as i32, g.y() as i32, g.width() as u32, g.height() as u32))
    }

    fn has_property(&self, win: Window, atom: Atom) -> bool {
        // xcb docs: https://www.mankier.com/3/xcb_get_property
        xcb::get_property(
            &self.conn,       // xcb connection to X11
            false,            // should the property be deleted
            win,              // target window to query
            atom,             // the property we want
            xcb::ATOM_ANY,    // the type of the property
            0,                // offset in the property to retrieve data from
            2,                // how many 32bit multiples of data to retrieve
        )
        .get_reply()
        .map(|r| r.type_() != xcb::NONE && r.value_len() > 0)
        .unwrap_or(false)
    }

    fn is_transient(&self, win: Window) -> bool {
        xcb::get_property(&self.conn, false, win, xcb::ATOM_WM_TRANSIENT_FOR, xcb::ATOM_WINDOW, 0, 1)
            .get_reply()
            .map(|r| r.value_len() > 0)
            .unwrap_or(false)
    }

    fn register_events(&self, win: Window, events: u32) {
        xcb::change_window_attributes(&self.conn, win, &[(xcb::CW_EVENT_MASK, events)]);
    }

    fn configure_window(&self, win: Window, region: Option<Rectangle>, border_width: Option<u32>, stack_above: bool) {
        let mut args = vec![];
        if let Some(r) = region {
            args.append(&mut vec![
                (CONFIG_WINDOW_X, r.x as u32),
                (CONFIG_WINDOW_Y, r.y as u32),
                (CONFIG_WINDOW_WIDTH, r.w),
                (CONFIG_WINDOW_HEIGHT, r.h)
            ])
        }
        if let Some(bw) = border_width {
            args.push((CONFIG_WINDOW_BORDER_WIDTH, bw));
        }
        if stack_above {
            args.push((CONFIG_WINDOW_STACK_MODE, CONFIG_WINDOW_STACK_ABOVE));
        }
        xcb::configure_window(&self.conn, win, &args);
    }

    fn pass_configure_request(&self, req: &ConfigureRequest) {
        // Build a request with all attributes set, then filter out to only include
        // those from the original request.
        let values = vec![
            (CONFIG_WINDOW_X, req.x as u32),
            (CONFIG_WINDOW_Y, req.y as u32),
            (CONFIG_WINDOW_WIDTH, u32::from(req.width)),
            (CONFIG_WINDOW_HEIGHT, u32::from(req.height)),
            (CONFIG_WINDOW_BORDER_WIDTH, u32::from(req.border_width)),
            (CONFIG_WINDOW_SIBLING, req.sibling),
            (CONFIG_WINDOW_STACK_MODE, u32::from(req.stack_mode)),
        ];
        let filtered_values: Vec<_> = values
            .into_iter()
            .filter(|&(mask, _)| mask & req.value_mask != 0)
            .collect();
        xcb::configure_window(&self.conn, req.window, &filtered_values);
    }

    fn send_configure_notify(&self, win: Window, region: Rectangle, border_width: u32) {
        let event = xcb::ConfigureNotifyEvent::new(
            win,
            win,
            xcb::NONE,
            region.x as i16,
            region.y as i16,
            region.w as u16,
            region.h as u16,
            border_width as u16,
            false,
        );
        xcb::send_event(&self.conn, false, win, xcb::EVENT_MASK_STRUCTURE_NOTIFY, &event);
    }

    fn set_window_border_color(&self, win: Window, color: u32) {
        xcb::change_window_attributes(&self.conn, win, &[(xcb::CW_BORDER_PIXEL, color)]);
    }

    fn focus_window(&self, id: Window) {
        xcb::set_input_focus(
            &self.conn,         // xcb connection to X11
            INPUT_FOCUS_POINTER_ROOT,
            id,                 // window to focus
            xcb::CURRENT_TIME,  // current time to avoid network race conditions
        );
        ewmh::set_active_window(&self.conn, self.preferred_screen, id);
    }

    /// Unsets EWMH's _NET_ACTIVE_WINDOW to indicate there is no active window.
    fn focus_nothing(&self) {
        xcb::set_input_focus(&self.conn, INPUT_FOCUS_POINTER_ROOT, self.root, xcb::CURRENT_TIME);
        ewmh::set_active_window(&self.conn, self.preferred_screen, xcb::NONE);
    }

    fn map_window(&self, win: Window) {
        xcb::map_window(&self.conn, win);
    }

    fn unmap_window(&self, win: Window) {
        xcb::unmap_window(&self.conn, win);
    }

    fn reparent_window(&self, win: Window, parent: Window, x: i16, y: i16) {
        xcb::reparent_window(&self.conn, win, parent, x, y);
    }

    fn create_window(&self, region: Rectangle, background: u32, events: u32) -> Window {
        let win = self.conn.generate_id();
        // xcb docs: https://www.mankier.com/3/xcb_create_window
        xcb::create_window(
            &self.conn,                 // xcb connection to X11
            COPY_FROM_PARENT,           // new window's depth
            win,                        // ID to be used for referring to the window
            self.root,                  // parent window
            region.x as i16,            // x-coordinate
            region.y as i16,            // y-coordinate
            region.w as u16,            // width
            region.h as u16,            // height
            0,                          // border width
            WINDOW_CLASS_INPUT_OUTPUT,  // class
            self.root_visual,           // visual
            &[
                (xcb::CW_BACK_PIXEL, background),
                (xcb::CW_OVERRIDE_REDIRECT, 1),
                (xcb::CW_EVENT_MASK, events),
            ],
        );
        win
    }

    fn destroy_window(&self, win: Window) {
        xcb::destroy_window(&self.conn, win);
    }

    fn selection_owner(&self, selection: Atom) -> Option<Window> {
        xcb::get_selection_owner(&self.conn, selection)
            .get_reply()
            .ok()
            .map(|r| r.owner())
            .filter(|&owner| owner != xcb::NONE)
    }

    fn set_selection_owner(&self, selection: Atom, owner: Option<Window>) {
        xcb::set_selection_owner(&self.conn, owner.unwrap_or(xcb::NONE), selection, xcb::CURRENT_TIME);
    }

    fn send_client_message(&self, dest: Window, win: Window, message_type: Atom, data: [u32; 5], event_mask: u32) {
        let data = xcb::ClientMessageData::from_data32(data);
        let event = xcb::ClientMessageEvent::new(32, win, message_type, data);
        xcb::send_event(&self.conn, false, dest, event_mask, &event);
    }

    fn set_cardinal_property(&self, win: Window, property: Atom, value: u32) {
        xcb::change_property(
            &self.conn,         // xcb connection to X11
            PROP_MODE_REPLACE,  // discard current prop and replace
            win,                // window to change prop on
            property,           // prop to change
            xcb::ATOM_CARDINAL, // type of prop
            32,                 // data format (8/16/32-bit)
            &[value],           // data
        );
    }

    fn signal_delete_window(&self, id: Window) {
        let atom = self.atoms.WM_DELETE_WINDOW;
        let has_wm_delete_window = self
            .get_wm_protocols(id)
            .map(|protocols| protocols.contains(&atom))
            .unwrap_or(false);

        if has_wm_delete_window {
            info!("Closing window {} using WM_DELETE", id);
            self.send_client_message(
                id,
                id,
                self.conn.WM_PROTOCOLS(),
                [atom, xcb::CURRENT_TIME, 0, 0, 0],
                xcb::EVENT_MASK_NO_EVENT,
            );
        } else {
            info!("Closing window {} using xcb::kill_client()", id);
            xcb::kill_client(&self.conn, id);
        }
    }

    // - Release all of the keybindings we are holding on to
    // - mark ourselves as no longer being the active root window
    fn cleanup(&self) {
        // xcb docs: https://www.mankier.com/3/xcb_ungrab_key
        xcb::ungrab_key(
            &self.conn, // xcb connection to X11
            xcb::GRAB_ANY as u8,
            self.root, // the window to ungrab keys for
            xcb::MOD_MASK_ANY as u16,
        );
        self.focus_nothing();
        self.conn.flush();
    }
}
