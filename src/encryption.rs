//! Capsule content sealing.
//!
//! One AES-256-CBC/PKCS#7 primitive ([`SealedContentCodec::seal`] /
//! [`SealedContentCodec::unseal`]) serves both text fields and binary media, so
//! the two paths cannot drift apart in cipher parameters.
//!
//! Wire format (SealedBlock):
//! - binary: iv(16) || ciphertext(16 * n)
//! - text:   hex(iv) (32 chars) || base64(ciphertext)
//!
//! The text form is the CryptoJS layout the mobile client writes
//! (`iv.toString(Hex) + AES.encrypt(...).toString()`), so stored capsules
//! decrypt unchanged.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::Zeroize;

use crate::errors::SealError;
use crate::keys::{CapsuleKey, OsRandom, SecureRandom};

/// IV size in bytes; also the AES block size.
pub const IV_LENGTH: usize = 16;

/// IV size in the text form (hex).
pub const IV_HEX_LENGTH: usize = IV_LENGTH * 2;

pub const BLOCK_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Pads and encrypts, or decrypts and unpads, one buffer under a key and IV.
pub trait BlockCipherProvider: Send + Sync {
    fn encrypt_padded(
        &self,
        key: &CapsuleKey,
        iv: &[u8; IV_LENGTH],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, SealError>;

    fn decrypt_padded(
        &self,
        key: &CapsuleKey,
        iv: &[u8; IV_LENGTH],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, SealError>;
}

/// AES-256 in CBC mode with PKCS#7 padding.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256Cbc;

impl BlockCipherProvider for Aes256Cbc {
    fn encrypt_padded(
        &self,
        key: &CapsuleKey,
        iv: &[u8; IV_LENGTH],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, SealError> {
        let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| SealError::InvalidKeyFormat)?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt_padded(
        &self,
        key: &CapsuleKey,
        iv: &[u8; IV_LENGTH],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, SealError> {
        let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| SealError::InvalidKeyFormat)?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| SealError::DecryptionFailed)
    }
}

/// Seals and unseals capsule content.
///
/// Holds no mutable state: one codec can be shared across threads and used for
/// any number of capsules concurrently.
#[derive(Debug, Default, Clone)]
pub struct SealedContentCodec<R = OsRandom, C = Aes256Cbc> {
    rng: R,
    cipher: C,
}

impl SealedContentCodec {
    /// Codec backed by the OS random source and AES-256-CBC.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: SecureRandom, C: BlockCipherProvider> SealedContentCodec<R, C> {
    pub fn with_parts(rng: R, cipher: C) -> Self {
        Self { rng, cipher }
    }

    /// Generate a fresh capsule key as 64 lowercase hex chars.
    pub fn generate_key(&self) -> Result<String, SealError> {
        Ok(CapsuleKey::generate(&self.rng)?.to_hex())
    }

    /// Encrypt `plaintext` under a fresh IV. Returns `iv || ciphertext`.
    pub fn seal(&self, plaintext: &[u8], key: &CapsuleKey) -> Result<Vec<u8>, SealError> {
        let mut iv = [0u8; IV_LENGTH];
        self.rng.fill(&mut iv)?;

        let ciphertext = self.cipher.encrypt_padded(key, &iv, plaintext)?;

        let mut sealed = Vec::with_capacity(IV_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&iv);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt an `iv || ciphertext` block.
    pub fn unseal(&self, sealed: &[u8], key: &CapsuleKey) -> Result<Vec<u8>, SealError> {
        if sealed.len() < IV_LENGTH {
            return Err(SealError::MalformedInput(format!(
                "need at least {IV_LENGTH} bytes for the IV, got {}",
                sealed.len()
            )));
        }
        let (iv_bytes, ciphertext) = sealed.split_at(IV_LENGTH);
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            tracing::debug!(len = ciphertext.len(), "sealed block has misaligned ciphertext");
            return Err(SealError::DecryptionFailed);
        }

        let mut iv = [0u8; IV_LENGTH];
        iv.copy_from_slice(iv_bytes);

        self.cipher.decrypt_padded(key, &iv, ciphertext).map_err(|e| {
            tracing::debug!("sealed block rejected by cipher: {e}");
            e
        })
    }

    /// Seal a text field. Output is `hex(iv) || base64(ciphertext)`.
    pub fn encrypt_text(&self, plaintext: &str, key_hex: &str) -> Result<String, SealError> {
        let key = CapsuleKey::from_hex(key_hex)?;
        let sealed = self.seal(plaintext.as_bytes(), &key)?;
        let (iv, ciphertext) = sealed.split_at(IV_LENGTH);
        Ok(format!("{}{}", hex::encode(iv), STANDARD.encode(ciphertext)))
    }

    /// Open a text field sealed by [`encrypt_text`](Self::encrypt_text).
    pub fn decrypt_text(&self, sealed: &str, key_hex: &str) -> Result<String, SealError> {
        let key = CapsuleKey::from_hex(key_hex)?;

        let iv_hex = sealed.get(..IV_HEX_LENGTH).ok_or_else(|| {
            SealError::MalformedInput(format!(
                "sealed text does not start with a {IV_HEX_LENGTH}-char IV"
            ))
        })?;
        let mut block = vec![0u8; IV_LENGTH];
        hex::decode_to_slice(iv_hex, &mut block)
            .map_err(|_| SealError::MalformedInput("IV is not valid hex".into()))?;

        let ciphertext = STANDARD
            .decode(&sealed[IV_HEX_LENGTH..])
            .map_err(|_| SealError::DecryptionFailed)?;
        block.extend_from_slice(&ciphertext);

        let plaintext = self.unseal(&block, &key)?;
        String::from_utf8(plaintext).map_err(|e| {
            e.into_bytes().zeroize();
            tracing::debug!("unsealed text is not valid UTF-8");
            SealError::DecryptionFailed
        })
    }

    /// Like [`decrypt_text`](Self::decrypt_text), for fields that are never
    /// empty when sealed. An empty result is treated as a wrong key.
    pub fn decrypt_required_text(&self, sealed: &str, key_hex: &str) -> Result<String, SealError> {
        let text = self.decrypt_text(sealed, key_hex)?;
        if text.is_empty() {
            return Err(SealError::DecryptionFailed);
        }
        Ok(text)
    }

    /// Seal a binary payload. Output is raw `iv || ciphertext`, ready for upload.
    pub fn encrypt_binary(&self, payload: &[u8], key_hex: &str) -> Result<Vec<u8>, SealError> {
        let key = CapsuleKey::from_hex(key_hex)?;
        self.seal(payload, &key)
    }

    /// Open a binary payload sealed by [`encrypt_binary`](Self::encrypt_binary).
    pub fn decrypt_binary(&self, sealed: &[u8], key_hex: &str) -> Result<Vec<u8>, SealError> {
        let key = CapsuleKey::from_hex(key_hex)?;
        self.unseal(sealed, &key)
    }
}

/// Seal a text field with the default codec.
#[cfg_attr(feature = "uniffi-bindgen", uniffi::export)]
pub fn encrypt_text(plaintext: &str, key_hex: &str) -> Result<String, SealError> {
    SealedContentCodec::new().encrypt_text(plaintext, key_hex)
}

/// Open a sealed text field with the default codec.
#[cfg_attr(feature = "uniffi-bindgen", uniffi::export)]
pub fn decrypt_text(sealed: &str, key_hex: &str) -> Result<String, SealError> {
    SealedContentCodec::new().decrypt_text(sealed, key_hex)
}

/// Seal a binary payload with the default codec.
pub fn encrypt_binary(payload: &[u8], key_hex: &str) -> Result<Vec<u8>, SealError> {
    SealedContentCodec::new().encrypt_binary(payload, key_hex)
}

/// Open a sealed binary payload with the default codec.
pub fn decrypt_binary(sealed: &[u8], key_hex: &str) -> Result<Vec<u8>, SealError> {
    SealedContentCodec::new().decrypt_binary(sealed, key_hex)
}
