//! Remote command parsing and dispatch
//!
//! The kiosk accepts a small closed set of string commands from an external
//! channel (the transport itself is out of scope). Parsing is strict: an
//! out-of-range volume, an unknown route or an unrecognized format yields a
//! descriptive error and the command is dropped by the caller.

use crate::router::{NavRouter, Screen};
use anyhow::{anyhow, Result};
use log::info;
use std::str::FromStr;

/// A command received from a remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reboot the device. Accepted but not acted upon yet.
    Reboot,
    /// Set device volume (0-100). Accepted but not acted upon yet.
    SetVolume(u8),
    /// Drive the UI to a named screen.
    NavigateTo(Screen),
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        if raw == "reboot" {
            return Ok(Command::Reboot);
        }
        if let Some(level) = raw.strip_prefix("set_volume:") {
            let level: i64 = level
                .parse()
                .map_err(|_| anyhow!("Invalid volume level: {}", level))?;
            if !(0..=100).contains(&level) {
                return Err(anyhow!("Volume out of range: {}", level));
            }
            return Ok(Command::SetVolume(level as u8));
        }
        if let Some(route) = raw.strip_prefix("navigate_to:") {
            let screen = match route {
                "welcome" => Screen::Welcome,
                "settings" => Screen::Settings,
                _ => return Err(anyhow!("Unknown route: {}", route)),
            };
            return Ok(Command::NavigateTo(screen));
        }
        Err(anyhow!("Unknown command format: {}", raw))
    }
}

/// Execute a parsed command.
///
/// Only `NavigateTo` is wired to the router today; the other variants are
/// accepted and left inert.
pub fn process(command: Command, router: &NavRouter) {
    match command {
        Command::NavigateTo(screen) => {
            router.navigate(screen, None, false);
        }
        other => {
            info!("Ignoring unimplemented remote command: {:?}", other);
        }
    }
}
