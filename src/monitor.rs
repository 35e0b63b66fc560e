use xcb::Window;

use crate::{
    client::{Client, ClientId, ClientList},
    xconnection::Rectangle,
};

pub const MIN_MASTER_FACTOR: f32 = 0.1;
pub const MAX_MASTER_FACTOR: f32 = 0.9;
// f32 noise from repeated steps, far below any adjustment a binding would make
const FACTOR_TOLERANCE: f32 = 1e-6;

/// The tiling surface: its region, the clients tiled on it and the tiling parameters.
pub struct Monitor {
    region: Rectangle,
    clients: ClientList,
    selected: Option<ClientId>,
    /// Index into the layout table
    layout: usize,
    master_factor: f32,
    num_master: u32,
}

impl Monitor {
    pub fn new(region: Rectangle, master_factor: f32, num_master: u32) -> Monitor {
        Monitor {
            region,
            clients: ClientList::new(),
            selected: None,
            layout: 0,
            master_factor: master_factor.max(MIN_MASTER_FACTOR).min(MAX_MASTER_FACTOR),
            num_master,
        }
    }

    pub fn region(&self) -> Rectangle {
        self.region
    }

    pub fn clients(&self) -> &ClientList {
        &self.clients
    }

    pub fn clients_mut(&mut self) -> &mut ClientList {
        &mut self.clients
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn client_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(id)
    }

    pub fn find(&self, win: Window) -> Option<ClientId> {
        self.clients.find(win)
    }

    pub fn selected(&self) -> Option<ClientId> {
        self.selected
    }

    pub fn selected_window(&self) -> Option<Window> {
        self.selected.and_then(|id| self.clients.get(id)).map(|c| c.id())
    }

    /// Only clients held in this monitor can be selected
    pub(crate) fn set_selected(&mut self, id: Option<ClientId>) {
        self.selected = id.filter(|&id| self.clients.get(id).is_some());
    }

    pub fn layout(&self) -> usize {
        self.layout
    }

    pub(crate) fn set_layout(&mut self, index: usize) {
        self.layout = index;
    }

    pub fn master_factor(&self) -> f32 {
        self.master_factor
    }

    pub fn num_master(&self) -> u32 {
        self.num_master
    }

    pub fn attach(&mut self, client: Client) -> ClientId {
        self.clients.attach(client)
    }

    /// Detach a client and release it. If it was selected the selection moves
    /// to the new head of the list (or nothing); the returned flag says whether
    /// the selection changed so the caller can refocus.
    pub fn remove(&mut self, id: ClientId) -> Option<(Client, bool)> {
        let client = self.clients.detach(id)?;
        let was_selected = self.selected == Some(id);
        if was_selected {
            self.selected = self.clients.head();
        }
        Some((client, was_selected))
    }

    /// Adjust the master factor by `delta`. A result outside of
    /// [MIN_MASTER_FACTOR, MAX_MASTER_FACTOR] is rejected outright and the
    /// factor is left as it was.
    ///
    /// Only a result within a millionth of a bound, which is what f32 steps
    /// such as 0.05 accumulate, is snapped onto it.
    pub fn set_master_factor(&mut self, delta: f32) -> bool {
        let factor = self.master_factor + delta;
        if !factor.is_finite()
            || factor < MIN_MASTER_FACTOR - FACTOR_TOLERANCE
            || factor > MAX_MASTER_FACTOR + FACTOR_TOLERANCE
        {
            return false;
        }
        self.master_factor = factor.max(MIN_MASTER_FACTOR).min(MAX_MASTER_FACTOR);
        true
    }

    pub fn inc_num_master(&mut self) {
        self.num_master += 1;
    }

    /// Decrement with a floor of zero; false if already there
    pub fn dec_num_master(&mut self) -> bool {
        if self.num_master == 0 {
            return false;
        }
        self.num_master -= 1;
        true
    }
}
