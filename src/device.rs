//! Collaborator interfaces for the surrounding platform
//!
//! The core never talks to a display, a web view or the OS device-management
//! capability directly; it goes through these traits. The binary wires the
//! log-only implementations below; a real deployment supplies platform-backed
//! ones, and the tests supply recording fakes.

use anyhow::Result;
use log::info;
use parking_lot::Mutex;

/// The surface that renders the target web application.
///
/// Events flow the other way as direct calls on the session controller
/// (`on_touch_down`, `on_page_finished`).
pub trait RenderSurface: Send + Sync {
    /// Display `url`. Implementations only reload when it differs from the
    /// currently loaded URL; the session controller already guards for that.
    fn load_url(&self, url: &str);
}

/// Screen brightness output. Writes are best-effort; the session controller
/// logs failures and moves on.
pub trait ScreenOutput: Send + Sync {
    /// Override the screen brightness. `None` defers to the system's
    /// automatic brightness.
    fn set_brightness(&self, level: Option<f32>) -> Result<()>;
}

/// The OS device-management capability.
pub trait DevicePolicy: Send + Sync {
    /// Whether this app holds the device-owner privilege.
    fn is_device_owner(&self) -> bool;

    /// Enable or disable full lock-task enforcement.
    fn set_lock_task_enabled(&self, enabled: bool) -> Result<()>;

    /// Lock the device immediately. Terminal for the kiosk session; the OS
    /// takes over from here.
    fn lock_now(&self) -> Result<()>;

    /// Clear keyguard/status-bar/lock-task restrictions ahead of giving up
    /// the owner privilege.
    fn clear_restrictions(&self) -> Result<()>;

    /// Relinquish the device-owner privilege. Known to fail on newer OS
    /// versions; callers treat failure as non-fatal.
    fn clear_device_owner(&self) -> Result<()>;

    /// Deactivate the device-admin component.
    fn remove_admin(&self) -> Result<()>;
}

/// Log-only render surface for headless runs.
pub struct LogSurface {
    loaded: Mutex<Option<String>>,
}

impl LogSurface {
    pub fn new() -> Self {
        Self {
            loaded: Mutex::new(None),
        }
    }
}

impl Default for LogSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for LogSurface {
    fn load_url(&self, url: &str) {
        let mut loaded = self.loaded.lock();
        if loaded.as_deref() == Some(url) {
            return;
        }
        info!("Render surface loading: {}", url);
        *loaded = Some(url.to_string());
    }
}

/// Log-only screen output for headless runs.
pub struct LogScreen;

impl ScreenOutput for LogScreen {
    fn set_brightness(&self, level: Option<f32>) -> Result<()> {
        match level {
            Some(value) => info!("Screen brightness override: {:.3}", value),
            None => info!("Screen brightness deferred to system auto"),
        }
        Ok(())
    }
}

/// Log-only device policy with a fixed owner flag, for headless runs.
pub struct StaticDevicePolicy {
    device_owner: bool,
}

impl StaticDevicePolicy {
    pub fn new(device_owner: bool) -> Self {
        Self { device_owner }
    }
}

impl DevicePolicy for StaticDevicePolicy {
    fn is_device_owner(&self) -> bool {
        self.device_owner
    }

    fn set_lock_task_enabled(&self, enabled: bool) -> Result<()> {
        info!("Lock-task enforcement: {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    fn lock_now(&self) -> Result<()> {
        info!("Device lock requested");
        Ok(())
    }

    fn clear_restrictions(&self) -> Result<()> {
        info!("Cleared device restrictions");
        Ok(())
    }

    fn clear_device_owner(&self) -> Result<()> {
        info!("Cleared device owner");
        Ok(())
    }

    fn remove_admin(&self) -> Result<()> {
        info!("Removed device admin");
        Ok(())
    }
}
