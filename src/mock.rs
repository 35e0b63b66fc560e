//! A fake X server for tests: it serves scripted window state and records
//! every request made of it.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet, VecDeque},
};

use anyhow::{Result, anyhow};
use xcb::{Window, Atom};

use crate::{
    config::parse_hex_color,
    xconnection::{
        XConn, XEvent, XcbKey, Rectangle, ConfigureRequest, WindowAttributes, MapState,
    },
};

pub const ROOT: Window = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Configure { win: Window, region: Option<Rectangle>, border: Option<u32>, raise: bool },
    PassConfigure(ConfigureRequest),
    ConfigureNotify(Window, Rectangle),
    BorderColor(Window, u32),
    RegisterEvents(Window, u32),
    Focus(Window),
    FocusNothing,
    Map(Window),
    Unmap(Window),
    Reparent { win: Window, parent: Window, x: i16, y: i16 },
    CreateWindow(Window, Rectangle),
    Destroy(Window),
    SetSelectionOwner(Atom, Option<Window>),
    ClientMessage { dest: Window, win: Window, message_type: Atom, data: [u32; 5], mask: u32 },
    SetCardinal(Window, Atom, u32),
    GrabKey(XcbKey),
    Delete(Window),
    Sync,
    Cleanup,
}

pub struct MockConn {
    screen: Rectangle,
    calls: RefCell<Vec<Call>>,
    windows: RefCell<HashMap<Window, (Rectangle, WindowAttributes)>>,
    properties: RefCell<HashSet<(Window, Atom)>>,
    transient: RefCell<HashSet<Window>>,
    selection_owners: RefCell<HashMap<Atom, Window>>,
    /// When set, claiming a selection silently fails as if another client won the race
    pub contested_selection: Cell<bool>,
    atoms: RefCell<HashMap<String, Atom>>,
    next_atom: Cell<Atom>,
    next_window: Cell<Window>,
    events: RefCell<VecDeque<XEvent>>,
}

impl MockConn {
    pub fn new() -> MockConn {
        MockConn::with_screen(Rectangle::new(0, 0, 1000, 824))
    }

    pub fn with_screen(screen: Rectangle) -> MockConn {
        MockConn {
            screen,
            calls: RefCell::new(vec![]),
            windows: RefCell::new(HashMap::new()),
            properties: RefCell::new(HashSet::new()),
            transient: RefCell::new(HashSet::new()),
            selection_owners: RefCell::new(HashMap::new()),
            contested_selection: Cell::new(false),
            atoms: RefCell::new(HashMap::new()),
            next_atom: Cell::new(100),
            next_window: Cell::new(0x10_0000),
            events: RefCell::new(VecDeque::new()),
        }
    }

    pub fn add_window(&self, win: Window, r: Rectangle) {
        self.add_window_with(win, r, false, MapState::Unmapped);
    }

    pub fn add_window_with(&self, win: Window, r: Rectangle, override_redirect: bool, map_state: MapState) {
        let attrs = WindowAttributes { override_redirect, map_state };
        self.windows.borrow_mut().insert(win, (r, attrs));
    }

    pub fn set_property(&self, win: Window, name: &str) {
        let atom = self.atom(name);
        self.properties.borrow_mut().insert((win, atom));
    }

    pub fn set_transient(&self, win: Window) {
        self.transient.borrow_mut().insert(win);
    }

    /// Make another client the owner of a selection
    pub fn claim_selection(&self, name: &str, owner: Window) {
        let atom = self.atom(name);
        self.selection_owners.borrow_mut().insert(atom, owner);
    }

    pub fn atom(&self, name: &str) -> Atom {
        let mut atoms = self.atoms.borrow_mut();
        if let Some(&a) = atoms.get(name) {
            return a;
        }
        let a = self.next_atom.get();
        self.next_atom.set(a + 1);
        atoms.insert(name.to_string(), a);
        a
    }

    pub fn push_event(&self, event: XEvent) {
        self.events.borrow_mut().push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// The last region a window was moved to, if any
    pub fn last_region(&self, win: Window) -> Option<Rectangle> {
        self.calls.borrow().iter().rev().find_map(|c| match c {
            Call::Configure { win: w, region: Some(r), .. } if *w == win => Some(*r),
            _ => None,
        })
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl XConn for MockConn {
    fn root(&self) -> Window {
        ROOT
    }

    fn preferred_screen(&self) -> i32 {
        0
    }

    fn screen_region(&self) -> Rectangle {
        self.screen
    }

    fn flush(&self) -> bool {
        true
    }

    fn sync(&self) {
        self.record(Call::Sync);
    }

    fn wait_for_event(&self) -> Result<Option<XEvent>> {
        self.events
            .borrow_mut()
            .pop_front()
            .map(Some)
            .ok_or_else(|| anyhow!("connection closed"))
    }

    fn register_wm(&self) -> Result<()> {
        Ok(())
    }

    fn intern_atom(&self, atom_name: &str) -> Result<Atom> {
        Ok(self.atom(atom_name))
    }

    fn resolve_color(&self, color: &str) -> Result<u32> {
        parse_hex_color(color)
            .map(|(r, g, b)| u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b))
            .ok_or_else(|| anyhow!("Cannot allocate color {}", color))
    }

    fn grab_key(&self, key: &XcbKey) {
        self.record(Call::GrabKey(*key));
    }

    fn query_tree(&self) -> Vec<Window> {
        let mut wins: Vec<Window> = self.windows.borrow().keys().copied().collect();
        wins.sort();
        wins
    }

    fn get_window_attributes(&self, win: Window) -> Option<WindowAttributes> {
        self.windows.borrow().get(&win).map(|(_, a)| *a)
    }

    fn get_geometry(&self, win: Window) -> Option<Rectangle> {
        self.windows.borrow().get(&win).map(|(r, _)| *r)
    }

    fn has_property(&self, win: Window, atom: Atom) -> bool {
        self.properties.borrow().contains(&(win, atom))
    }

    fn is_transient(&self, win: Window) -> bool {
        self.transient.borrow().contains(&win)
    }

    fn register_events(&self, win: Window, events: u32) {
        self.record(Call::RegisterEvents(win, events));
    }

    fn configure_window(&self, win: Window, region: Option<Rectangle>, border: Option<u32>, raise: bool) {
        self.record(Call::Configure { win, region, border, raise });
    }

    fn pass_configure_request(&self, req: &ConfigureRequest) {
        self.record(Call::PassConfigure(*req));
    }

    fn send_configure_notify(&self, win: Window, region: Rectangle, _border_width: u32) {
        self.record(Call::ConfigureNotify(win, region));
    }

    fn set_window_border_color(&self, win: Window, color: u32) {
        self.record(Call::BorderColor(win, color));
    }

    fn focus_window(&self, win: Window) {
        self.record(Call::Focus(win));
    }

    fn focus_nothing(&self) {
        self.record(Call::FocusNothing);
    }

    fn map_window(&self, win: Window) {
        self.record(Call::Map(win));
    }

    fn unmap_window(&self, win: Window) {
        self.record(Call::Unmap(win));
    }

    fn reparent_window(&self, win: Window, parent: Window, x: i16, y: i16) {
        self.record(Call::Reparent { win, parent, x, y });
    }

    fn create_window(&self, region: Rectangle, _background: u32, _events: u32) -> Window {
        let win = self.next_window.get();
        self.next_window.set(win + 1);
        self.record(Call::CreateWindow(win, region));
        win
    }

    fn destroy_window(&self, win: Window) {
        self.record(Call::Destroy(win));
    }

    fn selection_owner(&self, selection: Atom) -> Option<Window> {
        self.selection_owners.borrow().get(&selection).copied()
    }

    fn set_selection_owner(&self, selection: Atom, owner: Option<Window>) {
        self.record(Call::SetSelectionOwner(selection, owner));
        if self.contested_selection.get() {
            return;
        }
        let mut owners = self.selection_owners.borrow_mut();
        match owner {
            Some(w) => owners.insert(selection, w),
            None => owners.remove(&selection),
        };
    }

    fn send_client_message(&self, dest: Window, win: Window, message_type: Atom, data: [u32; 5], mask: u32) {
        self.record(Call::ClientMessage { dest, win, message_type, data, mask });
    }

    fn set_cardinal_property(&self, win: Window, property: Atom, value: u32) {
        self.record(Call::SetCardinal(win, property, value));
    }

    fn signal_delete_window(&self, win: Window) {
        self.record(Call::Delete(win));
    }

    fn cleanup(&self) {
        self.record(Call::Cleanup);
    }
}
