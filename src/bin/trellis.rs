use anyhow::Result;
use simplelog::{LevelFilter, SimpleLogger};
use trellis::{bindings, Config, WindowManager, XcbConnection};

fn main() -> Result<()> {
    // -- logging --
    let level = match std::env::var("TRELLIS_LOG").as_deref() {
        Ok("debug") => LevelFilter::Debug,
        _ => LevelFilter::Info,
    };
    SimpleLogger::init(level, simplelog::Config::default())?;

    bindings::ignore_child_exits()?;

    let conn = XcbConnection::new()?;
    let mut wm = WindowManager::new(&conn, Config::default())?;

    let result = wm.run();
    wm.cleanup();
    result
}
