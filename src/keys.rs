//! Per-capsule key generation and parsing.
//!
//! Every capsule is sealed under its own random 256-bit key. Keys cross the
//! storage boundary as 64-char lowercase hex; once parsed they live in a
//! [`CapsuleKey`], which is zeroized on drop and never printed.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::SealError;

/// Key size in bytes (AES-256).
pub const KEY_LENGTH: usize = 32;

/// Key size as stored: 2 hex chars per byte.
pub const KEY_HEX_LENGTH: usize = KEY_LENGTH * 2;

/// A source of cryptographically secure random bytes.
///
/// Implementations must either fill the whole buffer or fail. Falling back to a
/// non-cryptographic generator is never acceptable.
pub trait SecureRandom: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), SealError>;
}

/// Operating-system CSPRNG via `getrandom`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), SealError> {
        getrandom::getrandom(dest).map_err(|e| SealError::RandomSourceUnavailable(e.to_string()))
    }
}

/// A parsed 32-byte capsule key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CapsuleKey([u8; KEY_LENGTH]);

impl CapsuleKey {
    /// Draw a fresh key from `rng`.
    pub fn generate(rng: &dyn SecureRandom) -> Result<Self, SealError> {
        let mut key = CapsuleKey([0u8; KEY_LENGTH]);
        rng.fill(&mut key.0)?;
        Ok(key)
    }

    /// Parse a stored key. Anything other than exactly 64 hex chars is rejected.
    pub fn from_hex(key_hex: &str) -> Result<Self, SealError> {
        let mut key = CapsuleKey([0u8; KEY_LENGTH]);
        hex::decode_to_slice(key_hex, &mut key.0).map_err(|_| SealError::InvalidKeyFormat)?;
        Ok(key)
    }

    /// Lowercase hex, the storage representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for CapsuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CapsuleKey(<redacted>)")
    }
}

/// Generate a new capsule key from the OS random source, as 64 lowercase hex chars.
#[cfg_attr(feature = "uniffi-bindgen", uniffi::export)]
pub fn generate_key() -> Result<String, SealError> {
    generate_key_with(&OsRandom)
}

/// Generate a new capsule key from a caller-supplied random source.
pub fn generate_key_with(rng: &dyn SecureRandom) -> Result<String, SealError> {
    Ok(CapsuleKey::generate(rng)?.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenRandom;

    impl SecureRandom for BrokenRandom {
        fn fill(&self, _dest: &mut [u8]) -> Result<(), SealError> {
            Err(SealError::RandomSourceUnavailable("entropy pool closed".into()))
        }
    }

    #[test]
    fn generated_key_is_64_lowercase_hex() {
        for _ in 0..32 {
            let key = generate_key().unwrap();
            assert_eq!(key.len(), KEY_HEX_LENGTH);
            assert!(key.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }
    }

    #[test]
    fn generated_keys_are_unique() {
        let a = generate_key().unwrap();
        let b = generate_key().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hex_roundtrip() {
        let key_hex = generate_key().unwrap();
        let key = CapsuleKey::from_hex(&key_hex).unwrap();
        assert_eq!(key.to_hex(), key_hex);
    }

    #[test]
    fn uppercase_hex_is_accepted_and_normalized() {
        let key_hex = "AB".repeat(KEY_LENGTH);
        let key = CapsuleKey::from_hex(&key_hex).unwrap();
        assert_eq!(key.to_hex(), "ab".repeat(KEY_LENGTH));
    }

    #[test]
    fn wrong_length_rejected() {
        let key_hex = generate_key().unwrap();
        assert!(matches!(
            CapsuleKey::from_hex(&key_hex[..63]),
            Err(SealError::InvalidKeyFormat)
        ));
        assert!(matches!(
            CapsuleKey::from_hex(&key_hex[..62]),
            Err(SealError::InvalidKeyFormat)
        ));
        assert!(matches!(
            CapsuleKey::from_hex(&format!("{key_hex}00")),
            Err(SealError::InvalidKeyFormat)
        ));
        assert!(matches!(CapsuleKey::from_hex(""), Err(SealError::InvalidKeyFormat)));
    }

    #[test]
    fn non_hex_rejected() {
        let key_hex = "zz".repeat(KEY_LENGTH);
        assert!(matches!(
            CapsuleKey::from_hex(&key_hex),
            Err(SealError::InvalidKeyFormat)
        ));
    }

    #[test]
    fn broken_random_source_is_fatal() {
        assert!(matches!(
            generate_key_with(&BrokenRandom),
            Err(SealError::RandomSourceUnavailable(_))
        ));
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = CapsuleKey::from_hex(&"11".repeat(KEY_LENGTH)).unwrap();
        let printed = format!("{key:?}");
        assert!(!printed.contains("11"));
    }
}
