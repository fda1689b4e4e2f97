//! Persistent preference store for non-sensitive settings
//!
//! This module handles loading and saving the plain (non-encrypted) settings
//! file: target URL, brightness, power policy, lock flag and boot-launch flag.
//! Every write updates the in-memory value, notifies subscribers with the key
//! that changed, and then persists the whole file. A corrupt or unreadable
//! file degrades to per-field defaults so the kiosk always has a renderable
//! configuration.

use crate::config::PowerSavingAction;
use crate::constants::{
    DEFAULT_AUTO_BRIGHTNESS_MAX, DEFAULT_AUTO_BRIGHTNESS_MIN, DEFAULT_BRIGHTNESS,
    DEFAULT_POWER_SAVING_DELAY_MINUTES, DEFAULT_POWER_SAVING_DIM_VALUE,
};
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Identifies which preference changed in a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefKey {
    PwaUrl,
    IsLockOn,
    Brightness,
    IsAutoBrightness,
    AutoBrightnessMin,
    AutoBrightnessMax,
    PowerSavingDelayMinutes,
    PowerSavingAction,
    PowerSavingDimValue,
    IsDimLockEnabled,
    LaunchOnBoot,
}

/// The full set of persisted preferences, with per-field defaults applied
/// when a key has never been written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub pwa_url: Option<String>,
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

impl Default for Preferences {
    fn default() -> Self {
        Self {
            pwa_url: None,
            is_lock_on: false,
            brightness: DEFAULT_BRIGHTNESS,
            is_auto_brightness: true,
            auto_brightness_min: DEFAULT_AUTO_BRIGHTNESS_MIN,
            auto_brightness_max: DEFAULT_AUTO_BRIGHTNESS_MAX,
            power_saving_delay_minutes: DEFAULT_POWER_SAVING_DELAY_MINUTES,
            power_saving_action: PowerSavingAction::Dim,
            power_saving_dim_value: DEFAULT_POWER_SAVING_DIM_VALUE,
            is_dim_lock_enabled: false,
            launch_on_boot: false,
        }
    }
}

/// Process-wide store for the plain settings file.
pub struct PrefStore {
    path: PathBuf,
    data: Mutex<Preferences>,
    watchers: Mutex<Vec<Sender<PrefKey>>>,
}

impl PrefStore {
    /// Open the store at `path`, loading existing values if present.
    ///
    /// A missing file yields defaults; a corrupt file is logged and also
    /// yields defaults rather than failing the application.
    pub fn open(path: PathBuf) -> Self {
        let data = match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(prefs) => prefs,
                Err(e) => {
                    warn!(
                        "Failed to parse preferences at {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Preferences::default()
                }
            },
            Err(_) => Preferences::default(),
        };
        Self {
            path,
            data: Mutex::new(data),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to change notifications. Each message names the key written.
    pub fn subscribe(&self) -> Receiver<PrefKey> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.watchers.lock().push(tx);
        rx
    }

    /// A copy of the current in-memory preferences.
    pub fn snapshot(&self) -> Preferences {
        self.data.lock().clone()
    }

    /// Persists the PWA target URL. An empty string clears the configuration.
    pub fn save_url(&self, url: &str) -> Result<()> {
        self.write(PrefKey::PwaUrl, |p| {
            p.pwa_url = if url.is_empty() {
                None
            } else {
                Some(url.to_string())
            };
        })
    }

    pub fn save_is_lock_on(&self, is_lock_on: bool) -> Result<()> {
        self.write(PrefKey::IsLockOn, |p| p.is_lock_on = is_lock_on)
    }

    pub fn save_brightness(&self, brightness: f32) -> Result<()> {
        self.write(PrefKey::Brightness, |p| p.brightness = brightness)
    }

    pub fn save_is_auto_brightness(&self, is_auto: bool) -> Result<()> {
        self.write(PrefKey::IsAutoBrightness, |p| p.is_auto_brightness = is_auto)
    }

    pub fn save_auto_brightness_min(&self, min: f32) -> Result<()> {
        self.write(PrefKey::AutoBrightnessMin, |p| p.auto_brightness_min = min)
    }

    pub fn save_auto_brightness_max(&self, max: f32) -> Result<()> {
        self.write(PrefKey::AutoBrightnessMax, |p| p.auto_brightness_max = max)
    }

    pub fn save_power_saving_delay_minutes(&self, delay: u32) -> Result<()> {
        self.write(PrefKey::PowerSavingDelayMinutes, |p| {
            p.power_saving_delay_minutes = delay
        })
    }

    pub fn save_power_saving_action(&self, action: PowerSavingAction) -> Result<()> {
        self.write(PrefKey::PowerSavingAction, |p| p.power_saving_action = action)
    }

    pub fn save_power_saving_dim_value(&self, value: f32) -> Result<()> {
        self.write(PrefKey::PowerSavingDimValue, |p| {
            p.power_saving_dim_value = value
        })
    }

    pub fn save_is_dim_lock_enabled(&self, enabled: bool) -> Result<()> {
        self.write(PrefKey::IsDimLockEnabled, |p| p.is_dim_lock_enabled = enabled)
    }

    pub fn save_launch_on_boot(&self, enabled: bool) -> Result<()> {
        self.write(PrefKey::LaunchOnBoot, |p| p.launch_on_boot = enabled)
    }

    /// Apply a mutation, notify subscribers, then persist to disk.
    ///
    /// The in-memory value and the notification are committed before the disk
    /// write so a transient I/O failure cannot stall the configuration
    /// pipeline; the error is still returned for the caller to log.
    fn write(&self, key: PrefKey, mutate: impl FnOnce(&mut Preferences)) -> Result<()> {
        let snapshot = {
            let mut data = self.data.lock();
            mutate(&mut data);
            data.clone()
        };
        self.notify(key);
        self.persist(&snapshot)
    }

    fn notify(&self, key: PrefKey) {
        self.watchers.lock().retain(|tx| tx.send(key).is_ok());
    }

    fn persist(&self, data: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create preferences directory")?;
        }
        let contents = toml::to_string_pretty(data).context("Failed to serialize preferences")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write preferences file: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::temp_data_dir;

    #[test]
    fn test_defaults_for_fresh_store() {
        let store = PrefStore::open(temp_data_dir("prefs").join("settings.toml"));
        let prefs = store.snapshot();
        assert!(prefs.pwa_url.is_none());
        assert!(!prefs.is_lock_on);
        assert_eq!(prefs.brightness, DEFAULT_BRIGHTNESS);
        assert!(prefs.is_auto_brightness);
        assert_eq!(prefs.auto_brightness_min, DEFAULT_AUTO_BRIGHTNESS_MIN);
        assert_eq!(prefs.auto_brightness_max, DEFAULT_AUTO_BRIGHTNESS_MAX);
        assert_eq!(
            prefs.power_saving_delay_minutes,
            DEFAULT_POWER_SAVING_DELAY_MINUTES
        );
        assert_eq!(prefs.power_saving_action, PowerSavingAction::Dim);
        assert_eq!(prefs.power_saving_dim_value, DEFAULT_POWER_SAVING_DIM_VALUE);
        assert!(!prefs.is_dim_lock_enabled);
        assert!(!prefs.launch_on_boot);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let path = temp_data_dir("prefs").join("settings.toml");
        {
            let store = PrefStore::open(path.clone());
            store.save_url("https://kiosk.example").unwrap();
            store.save_is_lock_on(true).unwrap();
            store.save_power_saving_action(PowerSavingAction::Off).unwrap();
            store.save_power_saving_delay_minutes(10).unwrap();
        }
        let reloaded = PrefStore::open(path);
        let prefs = reloaded.snapshot();
        assert_eq!(prefs.pwa_url.as_deref(), Some("https://kiosk.example"));
        assert!(prefs.is_lock_on);
        assert_eq!(prefs.power_saving_action, PowerSavingAction::Off);
        assert_eq!(prefs.power_saving_delay_minutes, 10);
    }

    #[test]
    fn test_empty_url_clears_configuration() {
        let store = PrefStore::open(temp_data_dir("prefs").join("settings.toml"));
        store.save_url("https://kiosk.example").unwrap();
        assert!(store.snapshot().pwa_url.is_some());
        store.save_url("").unwrap();
        assert!(store.snapshot().pwa_url.is_none());
    }

    #[test]
    fn test_change_notification_carries_key() {
        let store = PrefStore::open(temp_data_dir("prefs").join("settings.toml"));
        let rx = store.subscribe();
        store.save_brightness(0.7).unwrap();
        store.save_launch_on_boot(true).unwrap();
        assert_eq!(rx.try_recv(), Ok(PrefKey::Brightness));
        assert_eq!(rx.try_recv(), Ok(PrefKey::LaunchOnBoot));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_corrupt_file_degrades_to_defaults() {
        let path = temp_data_dir("prefs").join("settings.toml");
        fs::write(&path, "not = [valid").unwrap();
        let store = PrefStore::open(path);
        let prefs = store.snapshot();
        assert!(prefs.pwa_url.is_none());
        assert_eq!(prefs.brightness, DEFAULT_BRIGHTNESS);
    }
}
