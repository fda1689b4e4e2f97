//! Kiosk configuration snapshot and the aggregator that produces it
//!
//! The aggregator is the single read model for the rest of the application:
//! it merges the preference store and the vault's derived security facts into
//! one immutable [`KioskConfig`] and republishes a complete snapshot whenever
//! any contributing value changes. The raw PINs never pass through here; only
//! the two derived booleans do.

use crate::prefs::{PrefStore, Preferences};
use crate::vault::Vault;
use crossbeam_channel::{Receiver, Sender};
use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;

/// Action taken when the inactivity timer fires (unless dim-lock escalates).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSavingAction {
    /// Lower the screen brightness to the configured dim value.
    #[default]
    Dim,
    /// Drive the screen brightness to a near-zero sentinel.
    Off,
}

/// Immutable configuration snapshot, recomputed on any input change.
///
/// Carries the security facts as derived booleans only; a raw PIN value never
/// appears in this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct KioskConfig {
    /// Target web address. `None` or empty means the kiosk is unconfigured.
    pub url: Option<String>,
    /// True while the admin PIN equals the factory default (or was never set).
    pub is_default_admin_pin: bool,
    /// True once a kiosk exit PIN has been configured.
    pub is_kiosk_pin_set: bool,
    /// Whether full lock-task enforcement is desired.
    pub is_lock_on: bool,
    pub brightness: f32,
    pub is_auto_brightness: bool,
    pub auto_brightness_min: f32,
    pub auto_brightness_max: f32,
    pub power_saving_delay_minutes: u32,
    pub power_saving_action: PowerSavingAction,
    pub power_saving_dim_value: f32,
    /// Escalate the power-saving action to an immediate device lock.
    pub is_dim_lock_enabled: bool,
    pub launch_on_boot: bool,
}

impl KioskConfig {
    /// True when no usable URL is configured.
    pub fn is_unconfigured(&self) -> bool {
        self.url.as_deref().unwrap_or("").is_empty()
    }

    fn from_parts(prefs: &Preferences, is_default_admin_pin: bool, is_kiosk_pin_set: bool) -> Self {
        Self {
            url: prefs.pwa_url.clone(),
            is_default_admin_pin,
            is_kiosk_pin_set,
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

/// Merge node over the preference store and the vault.
///
/// Holds the last-known value of every field and re-emits a complete snapshot
/// on every upstream notification, so subscribers always have a renderable
/// configuration even when only a single field changed. Eventual consistency
/// across fields; each field is simply the most recently observed value.
pub struct ConfigAggregator {
    prefs: Arc<PrefStore>,
    vault: Arc<Vault>,
    current: Mutex<KioskConfig>,
    subscribers: Mutex<Vec<Sender<KioskConfig>>>,
}

impl ConfigAggregator {
    pub fn new(prefs: Arc<PrefStore>, vault: Arc<Vault>) -> Arc<Self> {
        let initial = KioskConfig::from_parts(
            &prefs.snapshot(),
            vault.is_default_admin_pin(),
            vault.is_kiosk_pin_set(),
        );
        Arc::new(Self {
            prefs,
            vault,
            current: Mutex::new(initial),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// The most recently published snapshot.
    pub fn current(&self) -> KioskConfig {
        self.current.lock().clone()
    }

    /// Subscribe to configuration snapshots.
    ///
    /// The current snapshot is delivered immediately, then one snapshot per
    /// contributing change.
    pub fn subscribe(&self) -> Receiver<KioskConfig> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let _ = tx.send(self.current());
        self.subscribers.lock().push(tx);
        rx
    }

    /// Start the pump thread that listens to both stores and republishes.
    ///
    /// The thread exits once both stores have been dropped (their notification
    /// channels disconnect).
    pub fn start(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let agg = Arc::clone(self);
        let mut prefs_rx = self.prefs.subscribe();
        let mut vault_rx = self.vault.subscribe();
        thread::Builder::new()
            .name("config-aggregator".to_string())
            .spawn(move || {
                info!("Configuration aggregator started");
                let mut prefs_open = true;
                let mut vault_open = true;
                while prefs_open || vault_open {
                    crossbeam_channel::select! {
                        recv(prefs_rx) -> msg => {
                            if msg.is_err() {
                                // Disconnected channels stay ready; swap in a
                                // never channel so select stops seeing them.
                                prefs_open = false;
                                prefs_rx = crossbeam_channel::never();
                                continue;
                            }
                        }
                        recv(vault_rx) -> msg => {
                            if msg.is_err() {
                                vault_open = false;
                                vault_rx = crossbeam_channel::never();
                                continue;
                            }
                        }
                    }
                    agg.republish();
                }
                info!("Configuration aggregator stopped");
            })
            .expect("Failed to spawn config-aggregator thread")
    }

    /// Rebuild the snapshot from the latest store values and publish it.
    ///
    /// Store reads never panic here: the stores substitute per-field defaults
    /// (and log) on any backing-storage failure, so the aggregate stream
    /// always carries a complete, renderable snapshot.
    pub fn republish(&self) {
        let config = KioskConfig::from_parts(
            &self.prefs.snapshot(),
            self.vault.is_default_admin_pin(),
            self.vault.is_kiosk_pin_set(),
        );
        *self.current.lock() = config.clone();
        self.subscribers
            .lock()
            .retain(|tx| tx.send(config.clone()).is_ok());
    }
}
