//! Secure credential vault with encrypted PIN storage
//!
//! This module owns the sensitive settings: the administrator PIN, the
//! optional kiosk exit PIN and the optional remote access key. Values are
//! stored AES-256-GCM encrypted (see the crypto module) in a 0o600 file.
//! The vault never hands a raw PIN to the rest of the application: callers
//! get verification booleans and the two derived facts ("is the admin PIN
//! still the default", "is a kiosk PIN set"), plus a change notification
//! channel so the configuration aggregator can republish.

use crate::constants::{
    ADMIN_PIN_MIN_LENGTH, DEFAULT_ADMIN_PIN, KIOSK_PIN_LENGTH, VAULT_FILE_PERMISSIONS,
    VAULT_PERMISSION_MASK_GROUP_OTHER,
};
use crate::crypto;
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Identifies which secret changed in a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultKey {
    AdminPin,
    KioskPin,
    RemoteAccessKey,
}

/// On-disk shape of the vault. Every value is base64(nonce || ciphertext).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct VaultData {
    encrypted_admin_pin: Option<String>,
    encrypted_kiosk_pin: Option<String>,
    encrypted_remote_access_key: Option<String>,
}

/// Process-wide store for sensitive settings.
pub struct Vault {
    path: PathBuf,
    data: Mutex<VaultData>,
    watchers: Mutex<Vec<Sender<VaultKey>>>,
}

impl Vault {
    /// Open the vault at `path`, loading existing secrets if present.
    ///
    /// A missing file yields an empty vault (admin PIN = factory default);
    /// a corrupt file is logged and treated the same way, keeping the kiosk
    /// available rather than failing startup.
    pub fn open(path: PathBuf) -> Self {
        let data = match fs::read_to_string(&path) {
            Ok(contents) => {
                Self::check_permissions(&path);
                match toml::from_str(&contents) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(
                            "Failed to parse vault at {}: {}. Starting with factory defaults.",
                            path.display(),
                            e
                        );
                        VaultData::default()
                    }
                }
            }
            Err(_) => VaultData::default(),
        };
        Self {
            path,
            data: Mutex::new(data),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Warn when the vault file is readable by group or others.
    fn check_permissions(path: &std::path::Path) {
        #[cfg(unix)]
        {
            if let Ok(metadata) = fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & VAULT_PERMISSION_MASK_GROUP_OTHER != 0 {
                    warn!(
                        "Vault file has permissive permissions: {:o}. Should be {:o} (user read/write only).",
                        mode & 0o777,
                        VAULT_FILE_PERMISSIONS
                    );
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = path;
        }
    }

    /// Subscribe to change notifications. Each message names the secret
    /// written; plaintext never travels on this channel.
    pub fn subscribe(&self) -> Receiver<VaultKey> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.watchers.lock().push(tx);
        rx
    }

    // --- ADMIN PIN OPERATIONS ---

    /// Check `input` against the stored admin PIN.
    ///
    /// Blank input fails immediately without touching storage. When no PIN
    /// was ever saved the factory default is in effect.
    pub fn verify_admin_pin(&self, input: &str) -> bool {
        if input.is_empty() {
            return false;
        }
        input == self.admin_pin()
    }

    /// True while the stored admin PIN equals the factory default.
    pub fn is_default_admin_pin(&self) -> bool {
        self.admin_pin() == DEFAULT_ADMIN_PIN
    }

    /// Persist a new administrator PIN.
    ///
    /// # Errors
    ///
    /// Rejects PINs shorter than [`ADMIN_PIN_MIN_LENGTH`] characters.
    pub fn save_admin_pin(&self, new_pin: &str) -> Result<()> {
        if new_pin.chars().count() < ADMIN_PIN_MIN_LENGTH {
            anyhow::bail!("PIN must be at least {} digits", ADMIN_PIN_MIN_LENGTH);
        }
        let encrypted = crypto::encrypt_secret(new_pin).context("Failed to encrypt admin PIN")?;
        let snapshot = {
            let mut data = self.data.lock();
            data.encrypted_admin_pin = Some(encrypted);
            data.clone()
        };
        self.persist(&snapshot)?;
        self.notify(VaultKey::AdminPin);
        Ok(())
    }

    /// Decrypt the stored admin PIN, degrading to the factory default (with a
    /// logged warning) when the stored value cannot be read.
    fn admin_pin(&self) -> String {
        let encrypted = self.data.lock().encrypted_admin_pin.clone();
        match encrypted {
            None => DEFAULT_ADMIN_PIN.to_string(),
            Some(value) => match crypto::decrypt_secret(&value) {
                Ok(pin) => pin,
                Err(e) => {
                    warn!("Failed to decrypt admin PIN: {}. Treating as factory default.", e);
                    DEFAULT_ADMIN_PIN.to_string()
                }
            },
        }
    }

    // --- KIOSK PIN OPERATIONS ---

    /// Check `input` against the stored kiosk exit PIN.
    ///
    /// Always false when no kiosk PIN is configured.
    pub fn verify_kiosk_pin(&self, input: &str) -> bool {
        if input.is_empty() {
            return false;
        }
        let encrypted = self.data.lock().encrypted_kiosk_pin.clone();
        match encrypted {
            None => false,
            Some(value) => match crypto::decrypt_secret(&value) {
                Ok(pin) => input == pin,
                Err(e) => {
                    warn!("Failed to decrypt kiosk PIN: {}", e);
                    false
                }
            },
        }
    }

    /// True once a kiosk exit PIN has been configured.
    pub fn is_kiosk_pin_set(&self) -> bool {
        self.data.lock().encrypted_kiosk_pin.is_some()
    }

    /// Persist a new kiosk exit PIN.
    ///
    /// # Errors
    ///
    /// Rejects anything that is not exactly [`KIOSK_PIN_LENGTH`] decimal digits.
    pub fn save_kiosk_pin(&self, new_pin: &str) -> Result<()> {
        if new_pin.chars().count() != KIOSK_PIN_LENGTH {
            anyhow::bail!("The PIN must be exactly {} digits long.", KIOSK_PIN_LENGTH);
        }
        if !new_pin.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("The PIN must only contain numeric digits.");
        }
        let encrypted = crypto::encrypt_secret(new_pin).context("Failed to encrypt kiosk PIN")?;
        let snapshot = {
            let mut data = self.data.lock();
            data.encrypted_kiosk_pin = Some(encrypted);
            data.clone()
        };
        self.persist(&snapshot)?;
        self.notify(VaultKey::KioskPin);
        Ok(())
    }

    /// Remove the kiosk exit PIN. Idempotent.
    ///
    /// The write is flushed to disk before returning so a subsequent read
    /// observes the clear even across an immediate power loss; disabling the
    /// exit PIN deserves the stronger durability.
    pub fn clear_kiosk_pin(&self) -> Result<()> {
        let snapshot = {
            let mut data = self.data.lock();
            data.encrypted_kiosk_pin = None;
            data.clone()
        };
        self.persist_durable(&snapshot)?;
        self.notify(VaultKey::KioskPin);
        Ok(())
    }

    // --- REMOTE ACCESS KEY OPERATIONS ---

    /// Persist the auth key used by the remote command channel.
    pub fn save_remote_access_key(&self, key: &str) -> Result<()> {
        let encrypted =
            crypto::encrypt_secret(key).context("Failed to encrypt remote access key")?;
        let snapshot = {
            let mut data = self.data.lock();
            data.encrypted_remote_access_key = Some(encrypted);
            data.clone()
        };
        self.persist(&snapshot)?;
        self.notify(VaultKey::RemoteAccessKey);
        Ok(())
    }

    /// True once a remote access key has been stored.
    pub fn has_remote_access_key(&self) -> bool {
        self.data.lock().encrypted_remote_access_key.is_some()
    }

    /// Wipe every secret (factory reset). The admin PIN reverts to the
    /// factory default and the kiosk PIN requirement disappears.
    pub fn clear_all(&self) -> Result<()> {
        let snapshot = {
            let mut data = self.data.lock();
            *data = VaultData::default();
            data.clone()
        };
        self.persist_durable(&snapshot)?;
        self.notify(VaultKey::AdminPin);
        self.notify(VaultKey::KioskPin);
        self.notify(VaultKey::RemoteAccessKey);
        Ok(())
    }

    // --- PERSISTENCE ---

    fn notify(&self, key: VaultKey) {
        self.watchers.lock().retain(|tx| tx.send(key).is_ok());
    }

    fn persist(&self, data: &VaultData) -> Result<()> {
        let contents = self.render(data)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write vault file: {}", self.path.display()))?;
        self.set_permissions()
    }

    /// Like [`Self::persist`] but fsyncs before returning.
    fn persist_durable(&self, data: &VaultData) -> Result<()> {
        let contents = self.render(data)?;
        let mut file = fs::File::create(&self.path)
            .with_context(|| format!("Failed to create vault file: {}", self.path.display()))?;
        file.write_all(contents.as_bytes())
            .context("Failed to write vault file")?;
        file.sync_all().context("Failed to flush vault file")?;
        self.set_permissions()
    }

    fn render(&self, data: &VaultData) -> Result<String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create vault directory")?;
        }
        toml::to_string_pretty(data).context("Failed to serialize vault")
    }

    fn set_permissions(&self) -> Result<()> {
        #[cfg(unix)]
        {
            let mut permissions = fs::metadata(&self.path)?.permissions();
            permissions.set_mode(VAULT_FILE_PERMISSIONS);
            fs::set_permissions(&self.path, permissions)
                .context("Failed to set vault file permissions")?;
        }
        Ok(())
    }
}
