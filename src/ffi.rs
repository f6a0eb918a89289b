//! FFI wrapper functions for UniFFI export.
//!
//! Provides `Vec<u8>` boundaries for the binary path, whose native signatures
//! take slices. The text path and key generation are exported directly from
//! `encryption.rs` and `keys.rs`.

use crate::encryption::{decrypt_binary, encrypt_binary};
use crate::errors::SealError;
use crate::keys::generate_key;

/// Generate a new per-capsule key, returned as 64 lowercase hex chars.
#[uniffi::export]
pub fn generate_capsule_key() -> Result<String, SealError> {
    generate_key()
}

/// Seal a media blob. Returns `iv || ciphertext`, ready for upload.
#[uniffi::export]
pub fn encrypt_capsule_blob(payload: Vec<u8>, key_hex: &str) -> Result<Vec<u8>, SealError> {
    encrypt_binary(&payload, key_hex)
}

/// Open a downloaded media blob.
#[uniffi::export]
pub fn decrypt_capsule_blob(sealed: Vec<u8>, key_hex: &str) -> Result<Vec<u8>, SealError> {
    decrypt_binary(&sealed, key_hex)
}
