//! Secret encryption and decryption using AES-256-GCM
//!
//! This module provides functions to encrypt and decrypt vault secrets (PINs,
//! remote access keys) using AES-256-GCM authenticated encryption with a
//! statically derived key.

use crate::constants::NONCE_LENGTH_BYTES;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};

/// Static seed for key derivation (consistent across all builds/versions)
///
/// This ensures that vault files remain portable across different versions
/// and builds of the application.
const KEY_SEED: &str = "org.kiosklock.vault.encryption.v1";

/// Derive 32-byte AES-256 key from static seed
///
/// Uses SHA-256 to generate a deterministic key from the constant seed.
/// This ensures the same key is used across all builds and versions.
fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KEY_SEED.as_bytes());
    hasher.finalize().into()
}

/// Encrypt a plaintext secret using AES-256-GCM
///
/// # Returns
///
/// Base64-encoded string containing: nonce (12 bytes) || ciphertext || auth tag
///
/// # Errors
///
/// Returns an error if random number generation or encryption fails.
pub fn encrypt_secret(plaintext: &str) -> Result<String> {
    let key = derive_key();
    let cipher = Aes256Gcm::new(&key.into());

    // Generate random 12-byte nonce
    let mut nonce_bytes = [0u8; NONCE_LENGTH_BYTES];
    getrandom::getrandom(&mut nonce_bytes)
        .map_err(|e| anyhow::anyhow!("Failed to generate random nonce: {:?}", e))?;
    let nonce = &nonce_bytes.into();

    // Encrypt (ciphertext includes authentication tag)
    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

    // Concatenate: nonce || ciphertext (ciphertext includes auth tag)
    let mut result = Vec::new();
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    // Return base64-encoded
    Ok(BASE64.encode(&result))
}

/// Decrypt an encrypted secret using AES-256-GCM
///
/// # Arguments
///
/// * `encrypted` - Base64-encoded encrypted data (nonce || ciphertext || auth tag)
///
/// # Errors
///
/// Returns an error if:
/// - Base64 decoding fails
/// - Data is too short (< 12 bytes)
/// - Decryption fails (wrong key, corrupted data, or failed authentication)
pub fn decrypt_secret(encrypted: &str) -> Result<String> {
    // Decode base64
    let data = BASE64
        .decode(encrypted)
        .context("Failed to decode base64")?;

    if data.len() < NONCE_LENGTH_BYTES {
        anyhow::bail!("Invalid encrypted data: too short");
    }

    // Extract nonce (first 12 bytes) and ciphertext (rest)
    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LENGTH_BYTES);
    let nonce_array: [u8; NONCE_LENGTH_BYTES] = nonce_bytes
        .try_into()
        .context("Invalid nonce length")?;
    let nonce = &nonce_array.into();

    // Decrypt
    let key = derive_key();
    let cipher = Aes256Gcm::new(&key.into());
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow::anyhow!("Decryption failed: {}", e))?;

    // Convert to string
    String::from_utf8(plaintext).context("Invalid UTF-8 in decrypted data")
}
