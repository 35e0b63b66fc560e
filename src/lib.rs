//! trellis: a small tiling window manager for X11 with a built-in system tray.

#[macro_use]
extern crate log;

pub mod bindings;
pub mod client;
pub mod config;
pub mod focus;
pub mod layout;
pub mod monitor;
pub mod tray;
pub mod wm;
pub mod xconnection;

#[cfg(test)]
mod mock;

pub use config::Config;
pub use xconnection::XcbConnection;
pub use wm::WindowManager;
