//! # capsule-seal-core
//!
//! Client-side confidentiality layer for time capsules.
//!
//! Capsule content is sealed on the device before it is stored or uploaded, so
//! no plaintext reaches the server ahead of the unlock date. Shipped to:
//! - **Mobile (React Native)**: UniFFI-generated Swift/Kotlin bindings
//!   (feature `uniffi-bindgen`)
//! - **Web**: WASM, with the `js` feature for browser randomness
//!
//! ## Security Design
//!
//! - One random 256-bit key per capsule, never reused, never password-derived
//! - Fresh random IV on every encryption call
//! - Text fields and media blobs share a single AES-256-CBC/PKCS#7 primitive
//! - Parsed keys are zeroized on drop; nothing key- or plaintext-bearing is logged
//! - The codec knows nothing about unlock dates; gating lives in `capsule`

#[cfg(feature = "uniffi-bindgen")]
uniffi::setup_scaffolding!();

pub mod capsule;
pub mod encryption;
pub mod errors;
pub mod keys;
pub mod labels;

#[cfg(feature = "uniffi-bindgen")]
pub mod ffi;

#[cfg(test)]
mod proptests;

// Re-export core types
pub use capsule::{
    open_capsule, open_media_blob, open_vault, seal_capsule, CapsuleDraft, CapsuleRecord,
    CapsuleState, KeyPlacement, MediaItem, MediaKind, MediaPayload, OpenedCapsule, SealedCapsule,
    VaultConfig,
};
pub use encryption::{
    decrypt_binary, decrypt_text, encrypt_binary, encrypt_text, Aes256Cbc, BlockCipherProvider,
    SealedContentCodec,
};
pub use errors::SealError;
pub use keys::{generate_key, CapsuleKey, OsRandom, SecureRandom};
