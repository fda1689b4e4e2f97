//! Admin gate controller
//!
//! Holds the pending PIN input for the login screen and runs the comparison
//! through the vault. The only security facts it ever sees are booleans: the
//! verification outcome and the aggregator's is-default flag, from which it
//! derives the default-PIN hint shown on a factory-fresh device.

use crate::config::KioskConfig;
use crate::constants::DEFAULT_ADMIN_PIN;
use crate::router::{NavRouter, Screen};
use crate::vault::Vault;
use log::warn;
use parking_lot::Mutex;
use std::sync::Arc;

/// State of the admin login screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminGateState {
    /// PIN entered so far.
    pub pin: String,
    /// Set after a failed verification; the UI shows a generic message.
    pub is_error: bool,
    /// Show the default-PIN hint while the admin PIN is still the default.
    pub is_default_pin_hint_visible: bool,
    /// The literal default PIN, populated only while the hint is visible.
    pub default_pin: String,
}

pub struct AdminGateController {
    vault: Arc<Vault>,
    router: Arc<NavRouter>,
    state: Mutex<AdminGateState>,
}

impl AdminGateController {
    pub fn new(vault: Arc<Vault>, router: Arc<NavRouter>) -> Self {
        Self {
            vault,
            router,
            state: Mutex::new(AdminGateState::default()),
        }
    }

    pub fn state(&self) -> AdminGateState {
        self.state.lock().clone()
    }

    /// React to a configuration snapshot: the hint tracks the is-default fact
    /// and the literal `"1234"` surfaces only while it is true.
    pub fn apply_config(&self, config: &KioskConfig) {
        let mut state = self.state.lock();
        state.is_default_pin_hint_visible = config.is_default_admin_pin;
        state.default_pin = if config.is_default_admin_pin {
            DEFAULT_ADMIN_PIN.to_string()
        } else {
            String::new()
        };
    }

    /// Update the pending PIN. Clears any previous error.
    pub fn set_pin(&self, pin: &str) {
        let mut state = self.state.lock();
        state.pin = pin.to_string();
        state.is_error = false;
    }

    /// Verify the pending PIN.
    ///
    /// Blank input fails immediately without a vault call. Success clears the
    /// input and routes to Settings with Welcome left on the back stack;
    /// failure clears the input and raises the error flag.
    pub fn submit(&self) {
        let pin = {
            let mut state = self.state.lock();
            let pin = std::mem::take(&mut state.pin);
            if pin.is_empty() {
                state.is_error = true;
                return;
            }
            pin
        };

        if self.vault.verify_admin_pin(&pin) {
            self.state.lock().is_error = false;
            self.router
                .navigate(Screen::Settings, Some(Screen::Welcome), false);
        } else {
            warn!("Invalid admin PIN attempt");
            self.state.lock().is_error = true;
        }
    }

    /// Back out of the login screen into kiosk mode.
    pub fn back_to_kiosk(&self) {
        self.router
            .navigate(Screen::Kiosk, Some(Screen::Welcome), false);
    }
}
