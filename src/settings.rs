//! Settings mutation controller
//!
//! Owns the pending-edit state for every configurable field plus the dialog
//! visibility flags, and performs validated writes back through the stores.
//! Nothing is written until an explicit save event; PIN rejections surface as
//! per-field error strings while the dialog stays open with the pending value
//! preserved for correction.

use crate::config::{KioskConfig, PowerSavingAction};
use crate::device::DevicePolicy;
use crate::prefs::PrefStore;
use crate::router::{NavRouter, Screen};
use crate::vault::Vault;
use log::{error, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// State of the settings screens.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsState {
    pub url: String,
    pub is_saving: bool,
    pub show_url_dialog: bool,

    pub new_admin_pin: String,
    pub is_default_admin_pin: bool,
    pub show_admin_pin_dialog: bool,
    pub admin_pin_error: Option<String>,

    pub new_kiosk_pin: String,
    pub is_kiosk_pin_set: bool,
    pub show_kiosk_pin_dialog: bool,
    pub kiosk_pin_error: Option<String>,

    pub is_lock_on: bool,
    pub brightness: f32,
    pub is_auto_brightness: bool,
    pub auto_brightness_min: f32,
    pub auto_brightness_max: f32,
    pub power_saving_delay_minutes: u32,
    pub power_saving_action: PowerSavingAction,
    pub power_saving_dim_value: f32,
    pub is_dim_lock_enabled: bool,
    pub launch_on_boot: bool,
}

impl Default for SettingsState {
    fn default() -> Self {
        let prefs = crate::prefs::Preferences::default();
        Self {
            url: String::new(),
            is_saving: false,
            show_url_dialog: false,
            new_admin_pin: String::new(),
            is_default_admin_pin: true,
            show_admin_pin_dialog: false,
            admin_pin_error: None,
            new_kiosk_pin: String::new(),
            is_kiosk_pin_set: false,
            show_kiosk_pin_dialog: false,
            kiosk_pin_error: None,
            is_lock_on: prefs.is_lock_on,
            brightness: prefs.brightness,
            is_auto_brightness: prefs.is_auto_brightness,
            auto_brightness_min: prefs.auto_brightness_min,
            auto_brightness_max: prefs.auto_brightness_max,
            power_saving_delay_minutes: prefs.power_saving_delay_minutes,
            power_saving_action: prefs.power_saving_action,
            power_saving_dim_value: prefs.power_saving_dim_value,
            is_dim_lock_enabled: prefs.is_dim_lock_enabled,
            launch_on_boot: prefs.launch_on_boot,
        }
    }
}

pub struct SettingsController {
    prefs: Arc<PrefStore>,
    vault: Arc<Vault>,
    router: Arc<NavRouter>,
    policy: Arc<dyn DevicePolicy>,
    state: Mutex<SettingsState>,
}

impl SettingsController {
    pub fn new(
        prefs: Arc<PrefStore>,
        vault: Arc<Vault>,
        router: Arc<NavRouter>,
        policy: Arc<dyn DevicePolicy>,
    ) -> Self {
        Self {
            prefs,
            vault,
            router,
            policy,
            state: Mutex::new(SettingsState::default()),
        }
    }

    pub fn state(&self) -> SettingsState {
        self.state.lock().clone()
    }

    /// Mirror the latest configuration snapshot into the screen state.
    pub fn apply_config(&self, config: &KioskConfig) {
        let mut state = self.state.lock();
        state.url = config.url.clone().unwrap_or_default();
        state.is_default_admin_pin = config.is_default_admin_pin;
        state.is_kiosk_pin_set = config.is_kiosk_pin_set;
        state.is_lock_on = config.is_lock_on;
        state.brightness = config.brightness;
        state.is_auto_brightness = config.is_auto_brightness;
        state.auto_brightness_min = config.auto_brightness_min;
        state.auto_brightness_max = config.auto_brightness_max;
        state.power_saving_delay_minutes = config.power_saving_delay_minutes;
        state.power_saving_action = config.power_saving_action;
        state.power_saving_dim_value = config.power_saving_dim_value;
        state.is_dim_lock_enabled = config.is_dim_lock_enabled;
        state.launch_on_boot = config.launch_on_boot;
    }

    // --- URL ---

    pub fn set_url(&self, url: &str) {
        self.state.lock().url = url.to_string();
    }

    pub fn open_url_dialog(&self) {
        self.state.lock().show_url_dialog = true;
    }

    pub fn dismiss_url_dialog(&self) {
        self.state.lock().show_url_dialog = false;
    }

    /// Save the pending URL.
    ///
    /// Accepted only for `http://`/`https://` prefixes or an empty value
    /// (which clears the configuration). A rejected value keeps the dialog
    /// open with nothing cleared and no user-visible error; the rejection is
    /// only logged.
    pub fn save_url(&self) {
        let pending = {
            let mut state = self.state.lock();
            state.is_saving = true;
            state.url.clone()
        };

        if pending.starts_with("https://") || pending.starts_with("http://") || pending.is_empty() {
            if let Err(e) = self.prefs.save_url(&pending) {
                warn!("Failed to persist URL: {:#}", e);
            }
            let mut state = self.state.lock();
            state.show_url_dialog = false;
            state.is_saving = false;
        } else {
            warn!("Rejected URL without http(s) scheme");
            self.state.lock().is_saving = false;
        }
    }

    // --- NAVIGATION ---

    /// Leave the settings area back into kiosk mode.
    pub fn exit_settings(&self) {
        self.router
            .navigate(Screen::Kiosk, Some(Screen::Settings), true);
    }

    // --- ADMIN PIN ---

    pub fn open_admin_pin_dialog(&self) {
        let mut state = self.state.lock();
        state.show_admin_pin_dialog = true;
        state.admin_pin_error = None;
    }

    pub fn set_admin_pin(&self, pin: &str) {
        let mut state = self.state.lock();
        state.new_admin_pin = pin.to_string();
        state.admin_pin_error = None;
    }

    pub fn save_admin_pin(&self) {
        let pending = self.state.lock().new_admin_pin.clone();
        match self.vault.save_admin_pin(&pending) {
            Ok(()) => {
                let mut state = self.state.lock();
                state.show_admin_pin_dialog = false;
                state.new_admin_pin.clear();
                state.admin_pin_error = None;
            }
            Err(e) => {
                // Dialog stays open, pending value preserved for correction.
                self.state.lock().admin_pin_error = Some(e.to_string());
            }
        }
    }

    pub fn dismiss_admin_pin_dialog(&self) {
        let mut state = self.state.lock();
        state.show_admin_pin_dialog = false;
        state.new_admin_pin.clear();
        state.admin_pin_error = None;
    }

    // --- KIOSK PIN ---

    pub fn open_kiosk_pin_dialog(&self) {
        let mut state = self.state.lock();
        state.show_kiosk_pin_dialog = true;
        state.kiosk_pin_error = None;
    }

    pub fn set_kiosk_pin(&self, pin: &str) {
        let mut state = self.state.lock();
        state.new_kiosk_pin = pin.to_string();
        state.kiosk_pin_error = None;
    }

    pub fn save_kiosk_pin(&self) {
        let pending = self.state.lock().new_kiosk_pin.clone();
        match self.vault.save_kiosk_pin(&pending) {
            Ok(()) => {
                let mut state = self.state.lock();
                state.show_kiosk_pin_dialog = false;
                state.new_kiosk_pin.clear();
                state.kiosk_pin_error = None;
            }
            Err(e) => {
                self.state.lock().kiosk_pin_error = Some(e.to_string());
            }
        }
    }

    pub fn clear_kiosk_pin(&self) {
        if let Err(e) = self.vault.clear_kiosk_pin() {
            warn!("Failed to clear kiosk PIN: {:#}", e);
        }
        let mut state = self.state.lock();
        state.show_kiosk_pin_dialog = false;
        state.new_kiosk_pin.clear();
        state.kiosk_pin_error = None;
    }

    pub fn dismiss_kiosk_pin_dialog(&self) {
        let mut state = self.state.lock();
        state.show_kiosk_pin_dialog = false;
        state.new_kiosk_pin.clear();
        state.kiosk_pin_error = None;
    }

    // --- SECURITY / LOCK MODE ---

    /// Flip lock-task enforcement. Takes effect asynchronously through the
    /// aggregator and the session controller, not here.
    pub fn toggle_lock_mode(&self) {
        let next = !self.state.lock().is_lock_on;
        if let Err(e) = self.prefs.save_is_lock_on(next) {
            warn!("Failed to persist lock mode: {:#}", e);
        }
    }

    /// Whether the app currently holds the device-owner privilege.
    pub fn is_device_owner(&self) -> bool {
        self.policy.is_device_owner()
    }

    /// Relinquish the device-owner privilege.
    ///
    /// Dim-lock needs owner rights, so it is switched off first. Every
    /// teardown step is best-effort: a failing call is logged and the
    /// sequence continues rather than aborting half-torn-down.
    pub fn disable_device_owner(&self) {
        if !self.policy.is_device_owner() {
            return;
        }
        if let Err(e) = self.prefs.save_is_dim_lock_enabled(false) {
            warn!("Failed to disable dim-lock: {:#}", e);
        }
        if let Err(e) = self.policy.clear_restrictions() {
            warn!("Failed to clear device restrictions: {:#}", e);
        }
        if let Err(e) = self.policy.clear_device_owner() {
            // Known to fail on newer OS versions.
            error!("Failed to clear device owner: {:#}", e);
        }
        if let Err(e) = self.policy.remove_admin() {
            warn!("Failed to remove device admin: {:#}", e);
        }
    }

    // --- DISPLAY ---

    pub fn set_brightness(&self, brightness: f32) {
        if let Err(e) = self.prefs.save_brightness(brightness) {
            warn!("Failed to persist brightness: {:#}", e);
        }
    }

    pub fn set_auto_brightness(&self, is_auto: bool) {
        if let Err(e) = self.prefs.save_is_auto_brightness(is_auto) {
            warn!("Failed to persist auto-brightness: {:#}", e);
        }
    }

    pub fn set_auto_brightness_min(&self, min: f32) {
        if let Err(e) = self.prefs.save_auto_brightness_min(min) {
            warn!("Failed to persist auto-brightness minimum: {:#}", e);
        }
    }

    pub fn set_auto_brightness_max(&self, max: f32) {
        if let Err(e) = self.prefs.save_auto_brightness_max(max) {
            warn!("Failed to persist auto-brightness maximum: {:#}", e);
        }
    }

    // --- POWER SAVING ---

    pub fn set_power_saving_delay(&self, minutes: u32) {
        if let Err(e) = self.prefs.save_power_saving_delay_minutes(minutes) {
            warn!("Failed to persist power-saving delay: {:#}", e);
        }
    }

    pub fn set_power_saving_action(&self, action: PowerSavingAction) {
        if let Err(e) = self.prefs.save_power_saving_action(action) {
            warn!("Failed to persist power-saving action: {:#}", e);
        }
    }

    pub fn set_power_saving_dim_value(&self, value: f32) {
        if let Err(e) = self.prefs.save_power_saving_dim_value(value) {
            warn!("Failed to persist power-saving dim value: {:#}", e);
        }
    }

    pub fn set_dim_lock_enabled(&self, enabled: bool) {
        if let Err(e) = self.prefs.save_is_dim_lock_enabled(enabled) {
            warn!("Failed to persist dim-lock flag: {:#}", e);
        }
    }

    // --- GENERAL ---

    pub fn set_launch_on_boot(&self, enabled: bool) {
        if let Err(e) = self.prefs.save_launch_on_boot(enabled) {
            warn!("Failed to persist boot-launch flag: {:#}", e);
        }
    }
}
