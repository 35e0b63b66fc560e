//! Tiling algorithms.
//!
//! Each algorithm is a pure function from the monitor state to a [Placement]
//! for every client it is responsible for. Applying the placements to the X
//! server is left to the window manager, as is the fullscreen override:
//! fullscreen clients are never handed to an algorithm.

use crate::{
    client::ClientId,
    monitor::Monitor,
    xconnection::Rectangle,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LayoutKind {
    /// Master column on the left, stack on the right
    Tile,
    /// Only the selected client is visible, filling the monitor
    Monocle,
    /// No tiling: clients keep their own geometry
    Floating,
    /// Rows and columns of equal cells
    Grid,
}

/// An entry in the layout table, selected by name
#[derive(Debug, PartialEq, Clone)]
pub struct Layout {
    pub name: String,
    pub kind: LayoutKind,
}

impl Layout {
    pub fn new(name: impl Into<String>, kind: LayoutKind) -> Layout {
        Layout {
            name: name.into(),
            kind,
        }
    }
}

/// Index of the layout called `name`, first match wins
pub fn find_layout(layouts: &[Layout], name: &str) -> Option<usize> {
    layouts.iter().position(|l| l.name == name)
}

/// What should happen to a client when a layout is applied
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Placement {
    /// Move and resize (border already subtracted), then show
    Tiled(Rectangle),
    /// Show at its current geometry
    Shown,
    /// Unmap without unmanaging
    Hidden,
}

impl LayoutKind {
    pub fn arrange(self, m: &Monitor, border_width: u32) -> Vec<(ClientId, Placement)> {
        match self {
            LayoutKind::Tile => tile(m, border_width),
            LayoutKind::Monocle => monocle(m, border_width),
            LayoutKind::Floating => floating(m),
            LayoutKind::Grid => grid(m, border_width),
        }
    }
}

/// Clients that take part in tiling: neither floating nor fullscreen, in list order
fn tiled_clients(m: &Monitor) -> Vec<ClientId> {
    m.clients()
        .ids()
        .filter(|&id| {
            m.client(id)
                .map(|c| !c.is_floating() && !c.is_fullscreen())
                .unwrap_or(false)
        })
        .collect()
}

fn tile(m: &Monitor, border_width: u32) -> Vec<(ClientId, Placement)> {
    let clients = tiled_clients(m);
    let n = clients.len() as u32;
    if n == 0 {
        return vec![];
    }

    let r = m.region();
    let num_master = m.num_master();
    let master_w = if n > num_master {
        (r.w as f32 * m.master_factor()) as u32
    } else {
        r.w
    };
    let stack_w = r.w.saturating_sub(master_w);
    let master_h = if num_master > 0 { r.h / num_master } else { r.h };
    let stack_count = n.saturating_sub(num_master);
    let stack_h = if stack_count > 0 { r.h / stack_count } else { r.h };

    clients
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let i = i as u32;
            let cell = if i < num_master {
                Rectangle::new(r.x, r.y + (i * master_h) as i32, master_w, master_h)
            } else {
                let row = i - num_master;
                Rectangle::new(
                    r.x + master_w as i32,
                    r.y + (row * stack_h) as i32,
                    stack_w,
                    stack_h,
                )
            };
            (id, Placement::Tiled(cell.inside_border(border_width)))
        })
        .collect()
}

fn monocle(m: &Monitor, border_width: u32) -> Vec<(ClientId, Placement)> {
    let selected = m.selected();
    tiled_clients(m)
        .into_iter()
        .map(|id| {
            if Some(id) == selected {
                (id, Placement::Tiled(m.region().inside_border(border_width)))
            } else {
                (id, Placement::Hidden)
            }
        })
        .collect()
}

// floating clients are shown here as well
fn floating(m: &Monitor) -> Vec<(ClientId, Placement)> {
    m.clients()
        .ids()
        .filter(|&id| m.client(id).map(|c| !c.is_fullscreen()).unwrap_or(false))
        .map(|id| (id, Placement::Shown))
        .collect()
}

/// Columns and rows for `n` cells: cols = ceil(sqrt(n)), rows = ceil(n / cols)
pub fn grid_dimensions(n: u32) -> (u32, u32) {
    if n == 0 {
        return (0, 0);
    }
    let mut cols = 1;
    while cols * cols < n {
        cols += 1;
    }
    let rows = (n + cols - 1) / cols;
    (cols, rows)
}

fn grid(m: &Monitor, border_width: u32) -> Vec<(ClientId, Placement)> {
    let clients = tiled_clients(m);
    let (cols, rows) = grid_dimensions(clients.len() as u32);
    if cols == 0 {
        return vec![];
    }

    let r = m.region();
    let cell_w = r.w / cols;
    let cell_h = r.h / rows;

    clients
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let i = i as u32;
            let (col, row) = (i % cols, i / cols);
            let cell = Rectangle::new(
                r.x + (col * cell_w) as i32,
                r.y + (row * cell_h) as i32,
                cell_w,
                cell_h,
            );
            (id, Placement::Tiled(cell.inside_border(border_width)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;

    fn monitor_with(n: u32, num_master: u32, master_factor: f32) -> (Monitor, Vec<ClientId>) {
        let mut m = Monitor::new(Rectangle::new(0, 0, 1000, 800), master_factor, num_master);
        let ids = (1..=n)
            .map(|w| m.attach(Client::new(w, Rectangle::new(10, 10, 50, 50))))
            .collect();
        (m, ids)
    }

    fn tiled(p: &[(ClientId, Placement)]) -> Vec<Rectangle> {
        p.iter()
            .filter_map(|(_, p)| match p {
                Placement::Tiled(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn tile_three_clients_one_master() {
        let (m, ids) = monitor_with(3, 1, 0.5);
        let placements = LayoutKind::Tile.arrange(&m, 2);

        // list order is most recently attached first
        assert_eq!(
            placements,
            vec![
                (ids[2], Placement::Tiled(Rectangle::new(0, 0, 496, 796))),
                (ids[1], Placement::Tiled(Rectangle::new(500, 0, 496, 396))),
                (ids[0], Placement::Tiled(Rectangle::new(500, 400, 496, 396))),
            ]
        );
    }

    #[test]
    fn tile_master_and_stack_counts() {
        for n in 0..9 {
            for num_master in 0..5 {
                let (m, _) = monitor_with(n, num_master, 0.55);
                let cells = tiled(&LayoutKind::Tile.arrange(&m, 1));
                assert_eq!(cells.len() as u32, n);

                let masters = cells.iter().filter(|r| r.x == 0 && n > 0 && num_master > 0).count() as u32;
                assert_eq!(masters, num_master.min(n), "n={} num_master={}", n, num_master);
                assert_eq!(n - masters, n.saturating_sub(num_master));
            }
        }
    }

    #[test]
    fn tile_master_takes_full_width_when_no_stack() {
        let (m, _) = monitor_with(2, 2, 0.55);
        let cells = tiled(&LayoutKind::Tile.arrange(&m, 0));
        assert_eq!(cells, vec![Rectangle::new(0, 0, 1000, 400), Rectangle::new(0, 400, 1000, 400)]);
    }

    #[test]
    fn tile_skips_floating_and_fullscreen() {
        let (mut m, ids) = monitor_with(3, 1, 0.5);
        if let Some(c) = m.client_mut(ids[0]) {
            c.floating = true;
        }
        if let Some(c) = m.client_mut(ids[1]) {
            c.fullscreen = true;
        }
        let placements = LayoutKind::Tile.arrange(&m, 0);
        assert_eq!(placements, vec![(ids[2], Placement::Tiled(Rectangle::new(0, 0, 1000, 800)))]);
    }

    #[test]
    fn grid_dimensions_cover_all_cells() {
        for n in 1..200 {
            let (cols, rows) = grid_dimensions(n);
            assert!(cols * rows >= n, "n={}", n);
            assert!(cols * (rows - 1) < n, "n={}", n);
        }
        assert_eq!(grid_dimensions(0), (0, 0));
        assert_eq!(grid_dimensions(5), (3, 2));
    }

    #[test]
    fn grid_assigns_row_major() {
        let (m, ids) = monitor_with(5, 1, 0.5);
        let placements = LayoutKind::Grid.arrange(&m, 2);
        let expected: Vec<Rectangle> = vec![
            Rectangle::new(0, 0, 329, 396),
            Rectangle::new(333, 0, 329, 396),
            Rectangle::new(666, 0, 329, 396),
            Rectangle::new(0, 400, 329, 396),
            Rectangle::new(333, 400, 329, 396),
        ];
        assert_eq!(tiled(&placements), expected);
        assert_eq!(placements[0].0, ids[4]);
    }

    #[test]
    fn monocle_shows_only_selected() {
        let (mut m, ids) = monitor_with(3, 1, 0.5);
        m.set_selected(Some(ids[1]));
        let placements = LayoutKind::Monocle.arrange(&m, 2);
        assert_eq!(
            placements,
            vec![
                (ids[2], Placement::Hidden),
                (ids[1], Placement::Tiled(Rectangle::new(0, 0, 996, 796))),
                (ids[0], Placement::Hidden),
            ]
        );
    }

    #[test]
    fn monocle_without_selection_hides_everything() {
        let (m, _) = monitor_with(2, 1, 0.5);
        let placements = LayoutKind::Monocle.arrange(&m, 2);
        assert!(placements.iter().all(|(_, p)| *p == Placement::Hidden));
    }

    #[test]
    fn floating_shows_all_but_fullscreen() {
        let (mut m, ids) = monitor_with(3, 1, 0.5);
        if let Some(c) = m.client_mut(ids[0]) {
            c.floating = true;
        }
        if let Some(c) = m.client_mut(ids[2]) {
            c.fullscreen = true;
        }
        let placements = LayoutKind::Floating.arrange(&m, 2);
        assert_eq!(placements, vec![(ids[1], Placement::Shown), (ids[0], Placement::Shown)]);
    }

    #[test]
    fn layouts_are_found_by_name() {
        let layouts = vec![Layout::new("tile", LayoutKind::Tile), Layout::new("grid", LayoutKind::Grid)];
        assert_eq!(find_layout(&layouts, "grid"), Some(1));
        assert_eq!(find_layout(&layouts, "spiral"), None);
    }
}
