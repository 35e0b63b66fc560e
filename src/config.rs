use crate::{
    bindings::{Action, UserFmtBinding},
    layout::{Layout, LayoutKind},
};

/// The main user facing configuration details
pub struct Config {
    /// Focused border color, `#rrggbb` or a color name known to the X server
    pub focused_border_color: String,
    /// Unfocused border color
    pub unfocused_border_color: String,
    /// The width of window borders in pixels
    pub border_width_px: u32,
    /// Initial share of the monitor width given to the master column, in [0.1, 0.9]
    pub master_factor: f32,
    /// Initial number of clients in the master column
    pub num_master: u32,
    /// Height of the tray strip, which is also the size of every icon
    pub tray_height: u32,
    /// Width of the tray strip, anchored to the bottom right corner of the screen
    pub tray_width: u32,
    /// Horizontal gap between tray icons in pixels
    pub tray_icon_gap: u32,
    pub tray_background: String,
    /// Key bindings, searched in order: first match wins
    pub key_bindings: Vec<UserFmtBinding>,
    /// Available layouts: the first one is active at startup
    pub layouts: Vec<Layout>,
}

macro_rules! bindings {
    (@arg) => { None };
    (@arg $arg:expr) => { Some($arg.to_string()) };
    ( $( $key:expr => $action:ident $( ( $arg:expr ) )? ),* $(,)? ) => {
        vec![
            $(
                UserFmtBinding {
                    key: $key.to_string(),
                    action: Action::$action,
                    arg: bindings!(@arg $( $arg )?),
                }
            ),*
        ]
    };
}

impl Config {
    /// Initialise a default Config, giving sensible (but minimal) values for all fields.
    pub fn default() -> Config {
        Config {
            focused_border_color: "#0088cc".to_string(),
            unfocused_border_color: "#333333".to_string(),
            border_width_px: 3,
            master_factor: 0.55,
            num_master: 1,
            tray_height: 24,
            tray_width: 300,
            tray_icon_gap: 2,
            tray_background: "#000000".to_string(),
            key_bindings: bindings! {
                "M-Return" => Spawn("xterm"),
                "M-d"      => Spawn("dmenu_run"),
                "M-w"      => Spawn("firefox"),
                "M-e"      => Spawn("thunar"),

                "M-q"      => KillClient,
                "M-j"      => FocusNext,
                "M-k"      => FocusPrev,
                "M-f"      => ToggleFullscreen,
                "M-space"  => ToggleFloating,

                "M-h"      => SetMasterFactor("-0.05"),
                "M-l"      => SetMasterFactor("+0.05"),
                "M-i"      => IncNumMaster,
                "M-o"      => DecNumMaster,

                "M-t"      => SetLayout("tile"),
                "M-m"      => SetLayout("monocle"),
                "M-g"      => SetLayout("grid"),
                "M-s"      => SetLayout("floating"),

                "M-S-q"    => Quit,
                "M-S-r"    => Spawn("trellis"),
            },
            layouts: vec![
                Layout::new("tile", LayoutKind::Tile),
                Layout::new("monocle", LayoutKind::Monocle),
                Layout::new("floating", LayoutKind::Floating),
                Layout::new("grid", LayoutKind::Grid),
            ],
        }
    }
}

/// Split `#rrggbb` into its channels. Anything else is left for the X server
/// to resolve as a color name.
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#0088cc"), Some((0x00, 0x88, 0xcc)));
        assert_eq!(parse_hex_color("#FFFFFF"), Some((0xff, 0xff, 0xff)));
    }

    #[test]
    fn non_hex_colors_are_left_to_the_server() {
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#12345g"), None);
    }

    #[test]
    fn default_layout_is_tile() {
        let config = Config::default();
        assert_eq!(config.layouts[0].kind, LayoutKind::Tile);
        assert_eq!(config.layouts.len(), 4);
    }

    #[test]
    fn default_bindings_carry_arguments() {
        let config = Config::default();
        let grow = config
            .key_bindings
            .iter()
            .find(|b| b.key == "M-l")
            .expect("M-l is bound");
        assert_eq!(grow.action, Action::SetMasterFactor);
        assert_eq!(grow.arg.as_deref(), Some("+0.05"));

        let quit = config.key_bindings.iter().find(|b| b.key == "M-S-q").expect("M-S-q is bound");
        assert_eq!(quit.action, Action::Quit);
        assert_eq!(quit.arg, None);
    }
}
