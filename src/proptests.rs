//! Property-based tests for the sealing codec.
//!
//! - Roundtrip properties for text and binary payloads
//! - Framing properties (IV prefix, block alignment)
//! - IV freshness across calls
//! - Rejection of short input and malformed keys

use proptest::prelude::*;

use crate::encryption::{
    decrypt_binary, decrypt_text, encrypt_binary, encrypt_text, BLOCK_SIZE, IV_HEX_LENGTH,
    IV_LENGTH,
};
use crate::errors::SealError;
use crate::keys::generate_key;

proptest! {
    /// Any string, including empty and multi-byte, survives a text roundtrip.
    #[test]
    fn text_roundtrip(plaintext in ".*") {
        let key = generate_key().unwrap();
        let sealed = encrypt_text(&plaintext, &key).unwrap();
        prop_assert_eq!(decrypt_text(&sealed, &key).unwrap(), plaintext);
    }

    /// Any byte sequence, including empty, survives a binary roundtrip.
    #[test]
    fn binary_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..2048)) {
        let key = generate_key().unwrap();
        let sealed = encrypt_binary(&payload, &key).unwrap();
        prop_assert_eq!(decrypt_binary(&sealed, &key).unwrap(), payload);
    }

    /// Sealed blobs are IV plus whole blocks, always at least one block.
    #[test]
    fn binary_is_block_aligned(payload in prop::collection::vec(any::<u8>(), 0..512)) {
        let key = generate_key().unwrap();
        let sealed = encrypt_binary(&payload, &key).unwrap();
        let ciphertext_len = sealed.len() - IV_LENGTH;
        prop_assert_eq!(ciphertext_len % BLOCK_SIZE, 0);
        prop_assert_eq!(ciphertext_len, (payload.len() / BLOCK_SIZE + 1) * BLOCK_SIZE);
    }

    /// The same plaintext under the same key never seals to the same output.
    #[test]
    fn fresh_iv_per_call(plaintext in ".{0,64}") {
        let key = generate_key().unwrap();
        let a = encrypt_text(&plaintext, &key).unwrap();
        let b = encrypt_text(&plaintext, &key).unwrap();
        prop_assert_ne!(&a[..IV_HEX_LENGTH], &b[..IV_HEX_LENGTH]);
        prop_assert_eq!(decrypt_text(&a, &key).unwrap(), decrypt_text(&b, &key).unwrap());
    }

    /// Anything shorter than an IV is malformed on the binary path.
    #[test]
    fn short_binary_rejected(input in prop::collection::vec(any::<u8>(), 0..IV_LENGTH)) {
        let key = generate_key().unwrap();
        prop_assert!(matches!(decrypt_binary(&input, &key), Err(SealError::MalformedInput(_))));
    }

    /// Anything shorter than a hex IV is malformed on the text path.
    #[test]
    fn short_text_rejected(input in "[0-9a-f]{0,31}") {
        let key = generate_key().unwrap();
        prop_assert!(matches!(decrypt_text(&input, &key), Err(SealError::MalformedInput(_))));
    }

    /// Keys of the wrong length are rejected before any cipher work.
    #[test]
    fn wrong_length_keys_rejected(key in "[0-9a-f]{0,63}") {
        prop_assert!(matches!(encrypt_text("x", &key), Err(SealError::InvalidKeyFormat)));
        prop_assert!(matches!(encrypt_binary(b"x", &key), Err(SealError::InvalidKeyFormat)));
    }
}
