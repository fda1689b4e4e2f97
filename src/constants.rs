//! Centralized constants for the kiosk lock engine
//!
//! This module contains all configurable numerical values used throughout
//! the application. Each constant includes documentation on its purpose,
//! unit, and recommended value range.

// ============================================================================
// ADMIN / KIOSK PIN CONFIGURATION
// ============================================================================

/// Factory-default administrator PIN, in effect until an admin PIN is saved.
/// Range: Fixed, surfaced as a login hint only while still in effect
pub const DEFAULT_ADMIN_PIN: &str = "1234";

/// Minimum length accepted for a new administrator PIN.
/// Unit: characters
/// Range: Fixed minimum, do not change without updating UI validation
pub const ADMIN_PIN_MIN_LENGTH: usize = 4;

/// Exact length required for the kiosk exit PIN (decimal digits only).
/// Unit: characters
/// Range: Fixed, do not change without updating UI validation
pub const KIOSK_PIN_LENGTH: usize = 4;

// ============================================================================
// SECRET GESTURE CONFIGURATION
// ============================================================================

/// Number of rapid touches required to open the admin login screen.
/// Unit: touch-down events
/// Recommended range: 7-15 (low enough to be usable, high enough to stay secret)
pub const SECRET_TAP_TARGET: u32 = 10;

/// Maximum gap between consecutive touches before the counter resets.
/// Unit: milliseconds
/// Recommended range: 500-1500
pub const SECRET_TAP_WINDOW_MS: u64 = 800;

// ============================================================================
// BRIGHTNESS & POWER SAVING CONFIGURATION
// ============================================================================

/// Default manual screen brightness when no preference exists.
/// Unit: fraction of full brightness (0.0-1.0)
pub const DEFAULT_BRIGHTNESS: f32 = 0.5;

/// Default lower bound for automatic brightness.
/// Unit: fraction of full brightness (0.0-1.0)
pub const DEFAULT_AUTO_BRIGHTNESS_MIN: f32 = 0.1;

/// Default upper bound for automatic brightness.
/// Unit: fraction of full brightness (0.0-1.0)
pub const DEFAULT_AUTO_BRIGHTNESS_MAX: f32 = 1.0;

/// Default inactivity delay before the power-saving action fires.
/// Unit: minutes
/// Recommended range: 1-60
pub const DEFAULT_POWER_SAVING_DELAY_MINUTES: u32 = 5;

/// Default brightness applied by the `dim` power-saving action.
/// Unit: fraction of full brightness
/// Recommended range: 0.1-0.2 (the settings UI clamps to this range)
pub const DEFAULT_POWER_SAVING_DIM_VALUE: f32 = 0.1;

/// Brightness sentinel applied by the `off` power-saving action.
/// Unit: fraction of full brightness
/// Range: Fixed near-zero value; 0.0 is rejected by some display stacks
pub const SCREEN_OFF_BRIGHTNESS: f32 = 0.001;

// ============================================================================
// POLLING & THREAD INTERVALS
// ============================================================================

/// Inactivity timer evaluation interval.
/// Unit: milliseconds
/// Recommended range: 250-2000 (must be well below the shortest delay)
pub const INACTIVITY_CHECK_INTERVAL_MS: u64 = 1000;

// ============================================================================
// FILE PERMISSIONS
// ============================================================================

/// Vault file permissions (user read/write only for security).
/// Unit: Unix permission bits (octal)
/// Recommended: 0o600 (secure) or 0o644 (readable by others)
pub const VAULT_FILE_PERMISSIONS: u32 = 0o600;

/// Permission mask to check for group/other access (security check).
/// Unit: Unix permission bits (octal)
/// Range: Fixed, used for security validation
pub const VAULT_PERMISSION_MASK_GROUP_OTHER: u32 = 0o077;

// ============================================================================
// CRYPTOGRAPHY
// ============================================================================

/// AES-256-GCM nonce length.
/// Unit: bytes
/// Range: Fixed at 12 bytes (96 bits) per GCM specification
pub const NONCE_LENGTH_BYTES: usize = 12;
