//! Focus controller: which client is selected and how that is shown.

use crate::{
    client::ClientId,
    monitor::Monitor,
    xconnection::{XConn, CrossingMode, CrossingDetail},
};

/// Pixel values for the two border states
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct BorderColors {
    pub normal: u32,
    pub focused: u32,
}

/**
 * Select `id`: the previously selected client (if different) gets the normal
 * border back, the new one gets the focused border, input focus and is raised
 * above its siblings. `None` leaves everything as it is.
 *
 * Returns false if there was nothing to focus.
 */
pub fn focus<X: XConn>(conn: &X, m: &mut Monitor, colors: BorderColors, id: Option<ClientId>) -> bool {
    let (id, win) = match id.and_then(|id| m.client(id).map(|c| (id, c.id()))) {
        Some(found) => found,
        None => return false,
    };

    if let Some(prev) = m.selected().filter(|&prev| prev != id) {
        if let Some(c) = m.client(prev) {
            conn.set_window_border_color(c.id(), colors.normal);
        }
    }

    m.set_selected(Some(id));
    conn.set_window_border_color(win, colors.focused);
    conn.focus_window(win);
    conn.configure_window(win, None, None, true);
    debug!("focused window {}", win);
    true
}

/// The client after the selection. None at the tail of the list.
pub fn next_client(m: &Monitor) -> Option<ClientId> {
    m.selected().and_then(|id| m.clients().next(id))
}

/// The client before the selection. None at the head of the list.
pub fn prev_client(m: &Monitor) -> Option<ClientId> {
    m.selected().and_then(|id| m.clients().prev(id))
}

/// Whether an enter-notify should move focus to the window entered.
///
/// Crossings caused by grabs, and pointer moves between a window and its own
/// children, must not steal focus.
pub fn focus_follows_crossing(mode: CrossingMode, detail: CrossingDetail) -> bool {
    mode == CrossingMode::Normal && detail != CrossingDetail::Inferior
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::Client,
        mock::{MockConn, Call},
        xconnection::Rectangle,
    };

    const COLORS: BorderColors = BorderColors { normal: 0x333333, focused: 0x0088cc };

    // list order ends up 3, 2, 1
    fn monitor() -> (Monitor, Vec<ClientId>) {
        let mut m = Monitor::new(Rectangle::new(0, 0, 1000, 800), 0.55, 1);
        let ids = (1..=3).map(|w| m.attach(Client::new(w, Rectangle::default()))).collect();
        (m, ids)
    }

    #[test]
    fn focus_swaps_borders_and_raises() {
        let conn = MockConn::new();
        let (mut m, ids) = monitor();
        focus(&conn, &mut m, COLORS, Some(ids[0]));
        conn.clear_calls();

        assert!(focus(&conn, &mut m, COLORS, Some(ids[1])));
        assert_eq!(m.selected(), Some(ids[1]));
        assert_eq!(
            conn.calls(),
            vec![
                Call::BorderColor(1, COLORS.normal),
                Call::BorderColor(2, COLORS.focused),
                Call::Focus(2),
                Call::Configure { win: 2, region: None, border: None, raise: true },
            ]
        );
    }

    #[test]
    fn refocusing_the_selection_keeps_its_border() {
        let conn = MockConn::new();
        let (mut m, ids) = monitor();
        focus(&conn, &mut m, COLORS, Some(ids[0]));
        conn.clear_calls();

        focus(&conn, &mut m, COLORS, Some(ids[0]));
        assert!(!conn.calls().contains(&Call::BorderColor(1, COLORS.normal)));
    }

    #[test]
    fn focusing_nothing_is_a_noop() {
        let conn = MockConn::new();
        let (mut m, ids) = monitor();
        m.set_selected(Some(ids[2]));

        assert!(!focus(&conn, &mut m, COLORS, None));
        assert_eq!(m.selected(), Some(ids[2]));
        assert!(conn.calls().is_empty());
    }

    #[test]
    fn stepping_stops_at_either_end() {
        let (mut m, ids) = monitor();
        m.set_selected(Some(ids[2]));
        assert_eq!(next_client(&m), Some(ids[1]));
        assert_eq!(prev_client(&m), None);

        m.set_selected(Some(ids[0]));
        assert_eq!(next_client(&m), None);
        assert_eq!(prev_client(&m), Some(ids[1]));
    }

    #[test]
    fn stepping_without_a_selection_finds_nothing() {
        let (m, _) = monitor();
        assert_eq!(next_client(&m), None);
        assert_eq!(prev_client(&m), None);
    }

    #[test]
    fn only_normal_non_inferior_crossings_move_focus() {
        assert!(focus_follows_crossing(CrossingMode::Normal, CrossingDetail::Nonlinear));
        assert!(focus_follows_crossing(CrossingMode::Normal, CrossingDetail::Ancestor));
        assert!(!focus_follows_crossing(CrossingMode::Normal, CrossingDetail::Inferior));
        assert!(!focus_follows_crossing(CrossingMode::Grab, CrossingDetail::Nonlinear));
        assert!(!focus_follows_crossing(CrossingMode::Ungrab, CrossingDetail::Nonlinear));
        assert!(!focus_follows_crossing(CrossingMode::WhileGrabbed, CrossingDetail::Virtual));
    }
}
