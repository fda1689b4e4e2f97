// Library interface for the kiosk lock engine
// This allows tests and the binary to access the crate's functionality

pub mod command;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod device;
pub mod gate;
pub mod prefs;
pub mod router;
pub mod session;
pub mod settings;
pub mod vault;

#[cfg(test)]
mod testutil;

use anyhow::Result;
use command::Command;
use config::ConfigAggregator;
use device::{DevicePolicy, RenderSurface, ScreenOutput};
use gate::AdminGateController;
use log::info;
use prefs::PrefStore;
use router::{NavRouter, Screen};
use session::SessionController;
use settings::SettingsController;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use vault::Vault;

/// Everything the kiosk engine owns, wired together through explicit
/// construction: the two stores, the configuration aggregator, the navigation
/// router and the three screen controllers.
pub struct KioskCore {
    pub prefs: Arc<PrefStore>,
    pub vault: Arc<Vault>,
    pub aggregator: Arc<ConfigAggregator>,
    pub router: Arc<NavRouter>,
    pub session: Arc<SessionController>,
    pub gate: Arc<AdminGateController>,
    pub settings: Arc<SettingsController>,
}

impl KioskCore {
    /// Build the engine over `data_dir` (which holds the plain settings file
    /// and the encrypted vault) and the platform collaborators.
    pub fn new(
        data_dir: &Path,
        policy: Arc<dyn DevicePolicy>,
        screen: Arc<dyn ScreenOutput>,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        let prefs = Arc::new(PrefStore::open(data_dir.join("settings.toml")));
        let vault = Arc::new(Vault::open(data_dir.join("vault.toml")));
        let aggregator = ConfigAggregator::new(Arc::clone(&prefs), Arc::clone(&vault));
        let router = Arc::new(NavRouter::new());
        let session = Arc::new(SessionController::new(
            Arc::clone(&router),
            Arc::clone(&policy),
            screen,
            surface,
        ));
        let gate = Arc::new(AdminGateController::new(
            Arc::clone(&vault),
            Arc::clone(&router),
        ));
        let settings = Arc::new(SettingsController::new(
            Arc::clone(&prefs),
            Arc::clone(&vault),
            Arc::clone(&router),
            policy,
        ));
        Self {
            prefs,
            vault,
            aggregator,
            router,
            session,
            gate,
            settings,
        }
    }

    /// Start the aggregator pump, the snapshot dispatch thread and the
    /// inactivity poll thread.
    ///
    /// Dispatch delivers every snapshot to all three controllers, so each one
    /// re-renders its derived state on any configuration change. The first
    /// delivered snapshot is the current one, which also settles the initial
    /// screen: an unconfigured URL routes to Welcome, a configured one
    /// activates the kiosk session.
    pub fn start_background_threads(&self) {
        self.aggregator.start();

        let rx = self.aggregator.subscribe();
        let session = Arc::clone(&self.session);
        let gate = Arc::clone(&self.gate);
        let settings = Arc::clone(&self.settings);
        thread::Builder::new()
            .name("config-dispatch".to_string())
            .spawn(move || {
                for config in rx.iter() {
                    session.apply_config(&config);
                    gate.apply_config(&config);
                    settings.apply_config(&config);
                }
            })
            .expect("Failed to spawn config-dispatch thread");

        let session = Arc::clone(&self.session);
        thread::Builder::new()
            .name("inactivity-timer".to_string())
            .spawn(move || loop {
                thread::sleep(Duration::from_millis(
                    constants::INACTIVITY_CHECK_INTERVAL_MS,
                ));
                session.poll_inactivity();
            })
            .expect("Failed to spawn inactivity-timer thread");

        info!("Background threads started");
    }

    /// Open the admin login screen (the Welcome screen's configure action).
    pub fn request_admin_login(&self) {
        self.router.navigate(Screen::Login, None, false);
    }

    /// Parse and execute one raw remote command.
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed commands; the caller logs it and
    /// drops the command.
    pub fn handle_remote_command(&self, raw: &str) -> Result<()> {
        let command: Command = raw.trim().parse()?;
        command::process(command, &self.router);
        Ok(())
    }
}
