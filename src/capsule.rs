//! Capsule records: sealing a draft into the stored document shape, and
//! opening stored documents once their unlock date has passed.
//!
//! Binary media are sealed here but uploaded by the caller; the record only
//! keeps the URL of the sealed blob. One capsule failing to open never affects
//! another.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::encryption::{BlockCipherProvider, SealedContentCodec};
use crate::errors::SealError;
use crate::keys::SecureRandom;
use crate::labels::{DECRYPTION_ERROR_TITLE, SEALED_DESCRIPTION, SEALED_TITLE};

/// Where a capsule's key is kept once the capsule is sealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyPlacement {
    /// Written into the record's `encryptionKey` field, next to the ciphertext.
    #[default]
    Embedded,
    /// Left out of the record and handed back to the caller to store elsewhere.
    Detached,
}

/// Vault-level settings for sealing and opening capsules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VaultConfig {
    pub key_placement: KeyPlacement,
    pub sealed_title: String,
    pub sealed_description: String,
    pub decryption_error_title: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_placement: KeyPlacement::Embedded,
            sealed_title: SEALED_TITLE.to_string(),
            sealed_description: SEALED_DESCRIPTION.to_string(),
            decryption_error_title: DECRYPTION_ERROR_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Text,
}

impl MediaKind {
    /// Binary kinds are stored as a URL to a sealed blob, not inline.
    pub fn is_binary(self) -> bool {
        !matches!(self, MediaKind::Text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A media item as stored.
///
/// `content` is sealed text for [`MediaKind::Text`], and the URL of the sealed
/// blob for every other kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub content: String,
    /// unix millis
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// The stored capsule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub user_id: String,
    /// sealed text
    pub title: String,
    /// sealed text, empty when the capsule has no description
    #[serde(default)]
    pub description: String,
    /// unix millis
    pub created_at: i64,
    /// unix millis
    pub unlock_date: i64,
    pub is_sealed: bool,
    pub is_unlocked: bool,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// hex key, present only under [`KeyPlacement::Embedded`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
}

impl CapsuleRecord {
    pub fn to_json(&self) -> Result<String, SealError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SealError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the unlock date has passed at `now_ms`.
    pub fn is_unlockable(&self, now_ms: i64) -> bool {
        self.unlock_date <= now_ms
    }
}

/// Plaintext content of a media item being sealed.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaPayload {
    Text(String),
    Photo(Vec<u8>),
    Video(Vec<u8>),
    Audio(Vec<u8>),
}

impl MediaPayload {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaPayload::Text(_) => MediaKind::Text,
            MediaPayload::Photo(_) => MediaKind::Photo,
            MediaPayload::Video(_) => MediaKind::Video,
            MediaPayload::Audio(_) => MediaKind::Audio,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftMedia {
    pub id: String,
    pub timestamp: i64,
    pub location: Option<Location>,
    pub payload: MediaPayload,
}

/// A capsule as composed by the user, before sealing.
#[derive(Debug, Clone, PartialEq)]
pub struct CapsuleDraft {
    pub title: String,
    pub description: Option<String>,
    pub unlock_date: i64,
    pub media: Vec<DraftMedia>,
    pub location: Option<Location>,
}

/// A sealed binary media item waiting to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub media_id: String,
    pub kind: MediaKind,
    /// iv || ciphertext
    pub blob: Vec<u8>,
}

/// Output of [`seal_capsule`]: a record whose binary media still need URLs.
pub struct SealedCapsule {
    record: CapsuleRecord,
    uploads: Vec<PendingUpload>,
    detached_key: Option<String>,
}

impl SealedCapsule {
    pub fn uploads(&self) -> &[PendingUpload] {
        &self.uploads
    }

    /// The key to store separately, under [`KeyPlacement::Detached`].
    pub fn detached_key(&self) -> Option<&str> {
        self.detached_key.as_deref()
    }

    /// Record where the sealed blob for `media_id` was uploaded.
    pub fn attach_url(&mut self, media_id: &str, url: impl Into<String>) -> Result<(), SealError> {
        let item = self
            .record
            .media
            .iter_mut()
            .find(|m| m.id == media_id && m.kind.is_binary())
            .ok_or_else(|| SealError::InvalidRecord(format!("no binary media item {media_id:?}")))?;
        item.content = url.into();
        self.uploads.retain(|u| u.media_id != media_id);
        Ok(())
    }

    /// The record, ready to persist. Fails while any binary item lacks a URL.
    pub fn into_record(self) -> Result<CapsuleRecord, SealError> {
        if let Some(missing) = self
            .record
            .media
            .iter()
            .find(|m| m.kind.is_binary() && m.content.is_empty())
        {
            return Err(SealError::InvalidRecord(format!(
                "media item {:?} has not been uploaded",
                missing.id
            )));
        }
        Ok(self.record)
    }
}

/// Seal a draft under a freshly generated per-capsule key.
///
/// Text fields are sealed inline. Binary media come back as [`PendingUpload`]s;
/// attach each upload's URL before calling [`SealedCapsule::into_record`].
pub fn seal_capsule<R: SecureRandom, C: BlockCipherProvider>(
    codec: &SealedContentCodec<R, C>,
    draft: &CapsuleDraft,
    user_id: &str,
    now_ms: i64,
    config: &VaultConfig,
) -> Result<SealedCapsule, SealError> {
    if draft.title.is_empty() {
        return Err(SealError::InvalidRecord("capsule title is required".into()));
    }
    let mut seen = HashSet::new();
    for item in &draft.media {
        if !seen.insert(item.id.as_str()) {
            return Err(SealError::InvalidRecord(format!(
                "duplicate media id {:?}",
                item.id
            )));
        }
    }

    let key = codec.generate_key()?;

    let title = codec.encrypt_text(&draft.title, &key)?;
    let description = match draft.description.as_deref() {
        Some(d) if !d.is_empty() => codec.encrypt_text(d, &key)?,
        _ => String::new(),
    };

    let mut media = Vec::with_capacity(draft.media.len());
    let mut uploads = Vec::new();
    for item in &draft.media {
        let content = match &item.payload {
            MediaPayload::Text(text) => codec.encrypt_text(text, &key)?,
            MediaPayload::Photo(bytes) | MediaPayload::Video(bytes) | MediaPayload::Audio(bytes) => {
                uploads.push(PendingUpload {
                    media_id: item.id.clone(),
                    kind: item.payload.kind(),
                    blob: codec.encrypt_binary(bytes, &key)?,
                });
                String::new()
            }
        };
        media.push(MediaItem {
            id: item.id.clone(),
            kind: item.payload.kind(),
            content,
            timestamp: item.timestamp,
            location: item.location.clone(),
        });
    }

    tracing::debug!(
        media = media.len(),
        uploads = uploads.len(),
        placement = ?config.key_placement,
        "sealed capsule"
    );

    let (encryption_key, detached_key) = match config.key_placement {
        KeyPlacement::Embedded => (Some(key), None),
        KeyPlacement::Detached => (None, Some(key)),
    };

    Ok(SealedCapsule {
        record: CapsuleRecord {
            id: String::new(),
            user_id: user_id.to_string(),
            title,
            description,
            created_at: now_ms,
            unlock_date: draft.unlock_date,
            is_sealed: true,
            is_unlocked: false,
            media,
            location: draft.location.clone(),
            encryption_key,
        },
        uploads,
        detached_key,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CapsuleState {
    /// Unlock date not reached; content untouched.
    Sealed,
    Opened,
    /// Unlock date reached but the content could not be decrypted.
    DecryptionError,
}

/// A capsule as presented to the vault view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedCapsule {
    pub id: String,
    pub state: CapsuleState,
    pub title: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub unlock_date: i64,
    pub media_count: usize,
    /// Decrypted text items and blob URLs; empty unless `state` is `Opened`.
    pub media: Vec<MediaItem>,
    pub location: Option<Location>,
}

/// Open a stored capsule at `now_ms`.
///
/// `detached_key` takes precedence over a key embedded in the record. Failures
/// never escape: they turn into [`CapsuleState::DecryptionError`] for this
/// capsule alone.
pub fn open_capsule<R: SecureRandom, C: BlockCipherProvider>(
    codec: &SealedContentCodec<R, C>,
    record: &CapsuleRecord,
    now_ms: i64,
    config: &VaultConfig,
    detached_key: Option<&str>,
) -> OpenedCapsule {
    let mut view = OpenedCapsule {
        id: record.id.clone(),
        state: CapsuleState::Sealed,
        title: config.sealed_title.clone(),
        description: Some(config.sealed_description.clone()),
        created_at: record.created_at,
        unlock_date: record.unlock_date,
        media_count: record.media.len(),
        media: Vec::new(),
        location: record.location.clone(),
    };

    if !record.is_unlockable(now_ms) {
        return view;
    }

    let key = detached_key.or(record.encryption_key.as_deref());
    match key.ok_or_else(|| SealError::InvalidRecord("capsule has no key".into())) {
        Ok(key) => match decrypt_contents(codec, record, key) {
            Ok((title, description, media)) => {
                view.state = CapsuleState::Opened;
                view.title = title;
                view.description = description;
                view.media = media;
            }
            Err(e) => mark_failed(&mut view, record, config, &e),
        },
        Err(e) => mark_failed(&mut view, record, config, &e),
    }
    view
}

/// Open every record independently.
pub fn open_vault<R, C, F>(
    codec: &SealedContentCodec<R, C>,
    records: &[CapsuleRecord],
    now_ms: i64,
    config: &VaultConfig,
    detached_key_for: F,
) -> Vec<OpenedCapsule>
where
    R: SecureRandom,
    C: BlockCipherProvider,
    F: Fn(&CapsuleRecord) -> Option<String>,
{
    records
        .iter()
        .map(|record| {
            let key = detached_key_for(record);
            open_capsule(codec, record, now_ms, config, key.as_deref())
        })
        .collect()
}

/// Decrypt a downloaded media blob.
pub fn open_media_blob<R: SecureRandom, C: BlockCipherProvider>(
    codec: &SealedContentCodec<R, C>,
    key_hex: &str,
    blob: &[u8],
) -> Result<Vec<u8>, SealError> {
    codec.decrypt_binary(blob, key_hex)
}

type OpenedContents = (String, Option<String>, Vec<MediaItem>);

fn decrypt_contents<R: SecureRandom, C: BlockCipherProvider>(
    codec: &SealedContentCodec<R, C>,
    record: &CapsuleRecord,
    key: &str,
) -> Result<OpenedContents, SealError> {
    let title = codec.decrypt_required_text(&record.title, key)?;
    let description = if record.description.is_empty() {
        None
    } else {
        Some(codec.decrypt_text(&record.description, key)?)
    };

    let media = record
        .media
        .iter()
        .map(|item| {
            let mut item = item.clone();
            if item.kind == MediaKind::Text {
                item.content = codec.decrypt_text(&item.content, key)?;
            }
            Ok(item)
        })
        .collect::<Result<Vec<_>, SealError>>()?;

    Ok((title, description, media))
}

fn mark_failed(view: &mut OpenedCapsule, record: &CapsuleRecord, config: &VaultConfig, err: &SealError) {
    tracing::warn!(capsule_id = %record.id, error = %err, "failed to open capsule");
    view.state = CapsuleState::DecryptionError;
    view.title = config.decryption_error_title.clone();
    view.description = None;
}
