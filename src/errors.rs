//! Error types for capsule sealing operations.
//!
//! Messages never carry key material or plaintext.

use thiserror::Error;

#[derive(Error, Debug)]
#[cfg_attr(feature = "uniffi-bindgen", derive(uniffi::Error))]
#[cfg_attr(feature = "uniffi-bindgen", uniffi(flat_error))]
pub enum SealError {
    #[error("Secure random source unavailable: {0}")]
    RandomSourceUnavailable(String),

    #[error("Invalid capsule key: must be 32 bytes hex")]
    InvalidKeyFormat,

    #[error("Malformed sealed input: {0}")]
    MalformedInput(String),

    #[error("Decryption failed: data corrupted or wrong key")]
    DecryptionFailed,

    #[error("Invalid capsule record: {0}")]
    InvalidRecord(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}
