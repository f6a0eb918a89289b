//! Placeholder labels shown in place of capsule content.
//!
//! These MUST stay identical to the strings the mobile client renders, so a
//! vault looks the same whether it was opened here or in the JS layer.

/// Title shown for a capsule whose unlock date has not passed.
pub const SEALED_TITLE: &str = "🔒 Sealed Capsule";

/// Description shown for a capsule whose unlock date has not passed.
pub const SEALED_DESCRIPTION: &str = "This capsule is sealed until its unlock date.";

/// Title shown for an unlocked capsule that failed to decrypt.
pub const DECRYPTION_ERROR_TITLE: &str = "🔒 Decryption Error";
