use xcb::Window;

use crate::xconnection::{XConn, Rectangle, CLIENT_EVENT_MASK};

/// Stable handle for a client held in a [ClientList]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct ClientId(usize);

/**
 * Meta-data around a client window that we are handling.
 *
 * Primarily state flags and information used when determining which clients
 * to show for a given monitor and how they are tiled.
 */
#[derive(Debug, PartialEq, Clone)]
pub struct Client {
    id: Window,
    geometry: Rectangle,
    /// Restored when leaving floating or fullscreen
    saved: Rectangle,
    // state flags
    pub(crate) floating: bool,
    pub(crate) fullscreen: bool,
    pub(crate) mapped: bool,
    /// Unmaps we issued ourselves whose notifications have not come back yet
    pub(crate) pending_unmaps: u32,
}

impl Client {
    /// Track a client window with a known geometry
    pub fn new(id: Window, geometry: Rectangle) -> Client {
        Client {
            id,
            geometry,
            saved: geometry,
            floating: false,
            fullscreen: false,
            mapped: false,
            pending_unmaps: 0,
        }
    }

    /// Start managing `id`: read its geometry, give it the normal border and
    /// select the events we need from it. `None` if the window has gone away.
    pub fn create<X: XConn>(conn: &X, id: Window, border_width: u32, border_color: u32) -> Option<Client> {
        let geometry = match conn.get_geometry(id) {
            Some(g) => g,
            None => {
                warn!("unable to query geometry of window {}, not managing it", id);
                return None;
            }
        };

        conn.configure_window(id, None, Some(border_width), false);
        conn.set_window_border_color(id, border_color);
        conn.register_events(id, CLIENT_EVENT_MASK);

        Some(Client::new(id, geometry))
    }

    /// The X window ID of this client
    pub fn id(&self) -> Window {
        self.id
    }

    pub fn geometry(&self) -> Rectangle {
        self.geometry
    }

    pub fn saved_geometry(&self) -> Rectangle {
        self.saved
    }

    pub fn is_floating(&self) -> bool {
        self.floating
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub(crate) fn set_geometry(&mut self, r: Rectangle) {
        self.geometry = r;
    }

    pub(crate) fn save_geometry(&mut self) {
        self.saved = self.geometry;
    }
}

#[derive(Debug)]
struct Node {
    client: Client,
    prev: Option<ClientId>,
    next: Option<ClientId>,
}

/// Insertion ordered client list: most recently attached first.
///
/// Nodes live in an arena of slots so a [ClientId] stays valid until that
/// client is detached; links are indices, never references.
#[derive(Debug, Default)]
pub struct ClientList {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<ClientId>,
    len: usize,
}

impl ClientList {
    pub fn new() -> ClientList {
        ClientList::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<ClientId> {
        self.head
    }

    /// Link a client in at the head of the list
    pub fn attach(&mut self, client: Client) -> ClientId {
        let node = Node {
            client,
            prev: None,
            next: self.head,
        };
        let id = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(node);
                ClientId(i)
            }
            None => {
                self.slots.push(Some(node));
                ClientId(self.slots.len() - 1)
            }
        };
        if let Some(old_head) = self.head.and_then(|h| self.node_mut(h)) {
            old_head.prev = Some(id);
        }
        self.head = Some(id);
        self.len += 1;
        id
    }

    /// Unlink a client using its stored neighbours and hand it back
    pub fn detach(&mut self, id: ClientId) -> Option<Client> {
        let node = self.slots.get_mut(id.0)?.take()?;
        match node.prev.and_then(|p| self.node_mut(p)) {
            Some(prev) => prev.next = node.next,
            None => self.head = node.next,
        }
        if let Some(next) = node.next.and_then(|n| self.node_mut(n)) {
            next.prev = node.prev;
        }
        self.free.push(id.0);
        self.len -= 1;
        Some(node.client)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.node(id).map(|n| &n.client)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.node_mut(id).map(|n| &mut n.client)
    }

    pub fn next(&self, id: ClientId) -> Option<ClientId> {
        self.node(id).and_then(|n| n.next)
    }

    pub fn prev(&self, id: ClientId) -> Option<ClientId> {
        self.node(id).and_then(|n| n.prev)
    }

    /// Linear scan for the client wrapping `win`
    pub fn find(&self, win: Window) -> Option<ClientId> {
        self.ids().find(|&id| self.get(id).map(|c| c.id()) == Some(win))
    }

    /// Client handles from head to tail
    pub fn ids(&self) -> impl Iterator<Item = ClientId> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let id = cursor?;
            cursor = self.next(id);
            Some(id)
        })
    }

    /// Clients from head to tail
    pub fn iter(&self) -> impl Iterator<Item = &Client> + '_ {
        self.ids().filter_map(move |id| self.get(id))
    }

    fn node(&self, id: ClientId) -> Option<&Node> {
        self.slots.get(id.0).and_then(|s| s.as_ref())
    }

    fn node_mut(&mut self, id: ClientId) -> Option<&mut Node> {
        self.slots.get_mut(id.0).and_then(|s| s.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConn, Call};

    fn client(win: Window) -> Client {
        Client::new(win, Rectangle::new(0, 0, 100, 100))
    }

    fn windows(list: &ClientList) -> Vec<Window> {
        list.iter().map(|c| c.id()).collect()
    }

    fn assert_links_symmetric(list: &ClientList) {
        for id in list.ids() {
            if let Some(n) = list.next(id) {
                assert_eq!(list.prev(n), Some(id));
            }
            if let Some(p) = list.prev(id) {
                assert_eq!(list.next(p), Some(id));
            }
        }
        if let Some(h) = list.head() {
            assert_eq!(list.prev(h), None);
        }
    }

    #[test]
    fn attach_inserts_at_head() {
        let mut list = ClientList::new();
        for w in 1..=4 {
            list.attach(client(w));
        }
        assert_eq!(windows(&list), vec![4, 3, 2, 1]);
        assert_eq!(list.len(), 4);
        assert_links_symmetric(&list);
    }

    #[test]
    fn detach_head_middle_and_tail() {
        let mut list = ClientList::new();
        let ids: Vec<ClientId> = (1..=5).map(|w| list.attach(client(w))).collect();

        assert_eq!(list.detach(ids[4]).map(|c| c.id()), Some(5));
        assert_eq!(windows(&list), vec![4, 3, 2, 1]);
        assert_links_symmetric(&list);

        assert_eq!(list.detach(ids[2]).map(|c| c.id()), Some(3));
        assert_eq!(windows(&list), vec![4, 2, 1]);
        assert_links_symmetric(&list);

        assert_eq!(list.detach(ids[0]).map(|c| c.id()), Some(1));
        assert_eq!(windows(&list), vec![4, 2]);
        assert_links_symmetric(&list);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn detaching_twice_is_harmless() {
        let mut list = ClientList::new();
        let a = list.attach(client(1));
        list.attach(client(2));
        assert!(list.detach(a).is_some());
        assert!(list.detach(a).is_none());
        assert_eq!(windows(&list), vec![2]);
    }

    #[test]
    fn interleaved_attach_detach_keeps_reverse_attach_order() {
        let mut list = ClientList::new();
        let mut expected: Vec<Window> = vec![];
        let mut live: Vec<(Window, ClientId)> = vec![];

        for w in 1..=12u32 {
            let id = list.attach(client(w));
            expected.insert(0, w);
            live.push((w, id));
            if w % 3 == 0 {
                let (gone, id) = live.remove(live.len() / 2);
                list.detach(id);
                expected.retain(|&x| x != gone);
            }
            assert_eq!(windows(&list), expected);
            assert_links_symmetric(&list);
        }
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut list = ClientList::new();
        let a = list.attach(client(1));
        list.detach(a);
        let b = list.attach(client(2));
        assert_eq!(a, b);
        assert_eq!(list.get(b).map(|c| c.id()), Some(2));
    }

    #[test]
    fn find_scans_by_window() {
        let mut list = ClientList::new();
        list.attach(client(10));
        let b = list.attach(client(20));
        assert_eq!(list.find(20), Some(b));
        assert_eq!(list.find(99), None);
    }

    #[test]
    fn create_applies_border_and_event_mask() {
        let conn = MockConn::new();
        conn.add_window(7, Rectangle::new(5, 6, 300, 200));

        let c = Client::create(&conn, 7, 3, 0x333333).expect("window exists");
        assert_eq!(c.geometry(), Rectangle::new(5, 6, 300, 200));
        assert_eq!(c.saved_geometry(), c.geometry());
        assert!(!c.is_floating() && !c.is_fullscreen());

        let calls = conn.calls();
        assert!(calls.contains(&Call::Configure { win: 7, region: None, border: Some(3), raise: false }));
        assert!(calls.contains(&Call::BorderColor(7, 0x333333)));
        assert!(calls.contains(&Call::RegisterEvents(7, CLIENT_EVENT_MASK)));
    }

    #[test]
    fn create_fails_for_missing_window() {
        let conn = MockConn::new();
        assert!(Client::create(&conn, 42, 3, 0).is_none());
        assert!(conn.calls().is_empty());
    }
}
