use std::{
    os::unix::process::CommandExt,
    process::{Command, Stdio},
};

use anyhow::{Result, Context, anyhow};
use nix::{
    sys::signal::{signal, SigHandler, Signal},
    unistd::setsid,
};
use xcb::Keysym;

use crate::xconnection::{XConn, XcbKey};

/// Something a key binding can do
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Action {
    /// Launch the argument through `/bin/sh -c`
    Spawn,
    KillClient,
    Quit,
    FocusNext,
    FocusPrev,
    ToggleFloating,
    ToggleFullscreen,
    /// Argument is a signed delta such as "+0.05"
    SetMasterFactor,
    IncNumMaster,
    DecNumMaster,
    /// Argument is the name of a layout
    SetLayout,
}

/// A key binding as the user writes it: `<MOD>-<key name>` plus the action to run
#[derive(Debug, PartialEq, Clone)]
pub struct UserFmtBinding {
    pub key: String,
    pub action: Action,
    pub arg: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct KeyBinding {
    pub key: XcbKey,
    pub action: Action,
    pub arg: Option<String>,
}

/// The ordered keybinding table
#[derive(Debug, Default)]
pub struct Bindings {
    bindings: Vec<KeyBinding>,
}

impl Bindings {
    pub fn new(user_bindings: &[UserFmtBinding]) -> Result<Bindings> {
        let bindings = user_bindings
            .iter()
            .map(|b| {
                Ok(KeyBinding {
                    key: parse_key_binding(&b.key)?,
                    action: b.action,
                    arg: b.arg.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Bindings { bindings })
    }

    pub fn grab_keys<X: XConn>(&self, conn: &X) {
        for binding in self.bindings.iter() {
            conn.grab_key(&binding.key);
        }
    }

    /// Linear scan for an exact match on modifiers and keysym; first match wins.
    pub fn get_action(&self, key: &XcbKey) -> Option<(Action, Option<&str>)> {
        self.bindings
            .iter()
            .find(|b| b.key == *key)
            .map(|b| (b.action, b.arg.as_deref()))
    }
}

/**
 * Convert user friendly key bindings into a modifier mask and keysym.
 *
 * Bindings are of the form '<MOD>-<key name>' with multiple modifiers being
 * allowed, and key names being either a single character or one of the
 * names understood by `keysym_from_name`.
 *
 * Allowed modifiers are:
 *   M - Super
 *   A - Alt
 *   C - Ctrl
 *   S - Shift
 */
pub fn parse_key_binding(pattern: &str) -> Result<XcbKey> {
    let mut parts: Vec<&str> = pattern.split('-').collect();
    let name = parts.pop().filter(|n| !n.is_empty())
        .with_context(|| format!("missing key name in binding '{}'", pattern))?;
    let keysym = keysym_from_name(name)
        .with_context(|| format!("unknown key '{}' in binding '{}'", name, pattern))?;

    let mask = parts
        .iter()
        .map(|s| match *s {
            "A" => Ok(xcb::MOD_MASK_1),
            "M" => Ok(xcb::MOD_MASK_4),
            "S" => Ok(xcb::MOD_MASK_SHIFT),
            "C" => Ok(xcb::MOD_MASK_CONTROL),
            _ => Err(anyhow!("invalid key binding prefix '{}' in '{}'", s, pattern)),
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .fold(0, |acc, v| acc | v);

    Ok(XcbKey::new(mask as u16, keysym))
}

/// Keysyms for the key names we accept. Printable ASCII characters are their
/// own keysym.
fn keysym_from_name(name: &str) -> Option<Keysym> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_graphic() {
            return Some(c as Keysym);
        }
    }

    let keysym = match name {
        "space" => 0x0020,
        "minus" => 0x002d,
        "plus" => 0x002b,
        "comma" => 0x002c,
        "period" => 0x002e,
        "BackSpace" => 0xff08,
        "Tab" => 0xff09,
        "Return" => 0xff0d,
        "Escape" => 0xff1b,
        "Home" => 0xff50,
        "Left" => 0xff51,
        "Up" => 0xff52,
        "Right" => 0xff53,
        "Down" => 0xff54,
        "Page_Up" => 0xff55,
        "Page_Down" => 0xff56,
        "End" => 0xff57,
        "Print" => 0xff61,
        "Delete" => 0xffff,
        _ => {
            let n: u32 = name.strip_prefix('F')?.parse().ok()?;
            if (1..=12).contains(&n) {
                0xffbe + n - 1
            } else {
                return None;
            }
        }
    };
    Some(keysym)
}

/// Stop the kernel from keeping zombies around for children we never wait on.
pub fn ignore_child_exits() -> Result<()> {
    unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) }
        .context("Failed to ignore SIGCHLD")?;
    Ok(())
}

/**
 * Run an external command through `/bin/sh -c`, detached and forgotten.
 *
 * The child runs in a new session with its stdio redirected to /dev/null. The
 * X connection is close-on-exec so it is not inherited. No handle is kept:
 * there is no exit status and no liveness tracking. Failing to start the
 * process is logged and otherwise ignored.
 */
pub fn spawn(cmd: impl Into<String>) {
    let s = cmd.into();
    let mut command = Command::new("/bin/sh");
    command
        .arg("-c")
        .arg(&s)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    unsafe {
        command.pre_exec(|| {
            // the manager ignores SIGCHLD and that disposition survives exec
            signal(Signal::SIGCHLD, SigHandler::SigDfl)?;
            setsid()?;
            Ok(())
        });
    }

    match command.spawn() {
        Ok(child) => debug!("spawned '{}' as pid {}", s, child.id()),
        Err(e) => warn!("error spawning external program '{}': {}", s, e),
    }
}
