//! SyncData - the unit of exchange between two peers.
//!
//! A `SyncData` is built fresh for each transmission, compressed into a
//! URL-safe text token, sent over the data channel and discarded once the
//! receiver has merged it. Nothing about it is persisted.
//!
//! Wire format: `BASE64URL(DEFLATE(JSON(SyncData)))`, no padding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::{AppSettings, Category, CategoryId, SyncError, Task, TaskId, Timestamp};

/// Current `SyncData` schema version.
pub const SYNC_DATA_VERSION: u32 = 1;

/// Upper bound on the decompressed JSON size (8 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 8 * 1024 * 1024;

/// Which side of a session supplied the `otherData` that won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtherDataSource {
    /// The hosting device's data was kept.
    Host,
    /// The joining device's data was kept.
    Guest,
}

/// Miscellaneous user fields that travel only when the session asks for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherData {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Profile picture: a URL, or [`crate::LOCAL_PROFILE_PICTURE`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    /// Base64 image bytes, present only when the picture is a local blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture_data: Option<String>,
    /// Application settings.
    #[serde(default)]
    pub settings: AppSettings,
}

/// The sync envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncData {
    /// Schema version (currently 1).
    pub version: u32,
    /// Full task snapshot.
    pub tasks: Vec<Task>,
    /// Task tombstones.
    #[serde(default)]
    pub deleted_tasks: Vec<TaskId>,
    /// Full category snapshot.
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Category tombstones.
    #[serde(default)]
    pub deleted_categories: Vec<CategoryId>,
    /// Favorite category IDs.
    #[serde(default)]
    pub favorite_categories: Vec<CategoryId>,
    /// When this envelope was built.
    pub last_modified: Timestamp,
    /// Miscellaneous user fields, when the session exchanges them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_data: Option<OtherData>,
    /// Set on a host reply: whose `other_data` won.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_data_source: Option<OtherDataSource>,
}

impl SyncData {
    /// Build an envelope from local lists, stamped with the current time.
    pub fn prepare(
        tasks: &[Task],
        deleted_tasks: &[TaskId],
        categories: &[Category],
        deleted_categories: &[CategoryId],
        favorite_categories: &[CategoryId],
        other_data: Option<OtherData>,
    ) -> Self {
        Self {
            version: SYNC_DATA_VERSION,
            tasks: tasks.to_vec(),
            deleted_tasks: deleted_tasks.to_vec(),
            categories: categories.to_vec(),
            deleted_categories: deleted_categories.to_vec(),
            favorite_categories: favorite_categories.to_vec(),
            last_modified: Utc::now(),
            other_data,
            other_data_source: None,
        }
    }

    /// Tag the envelope with the side whose `other_data` won.
    pub fn with_other_data_source(mut self, source: OtherDataSource) -> Self {
        self.other_data_source = Some(source);
        self
    }

    /// Serialize, compress and encode as a URL-safe token.
    pub fn compress(&self) -> Result<String, SyncError> {
        let json = serde_json::to_vec(self).map_err(SyncError::Serialization)?;
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&json).map_err(SyncError::Compression)?;
        let compressed = encoder.finish().map_err(SyncError::Compression)?;
        Ok(URL_SAFE_NO_PAD.encode(compressed))
    }

    /// Decode a token produced by [`SyncData::compress`].
    ///
    /// Returns `None` for anything malformed. Use [`SyncData::try_decompress`]
    /// to learn why.
    pub fn decompress(token: &str) -> Option<Self> {
        Self::try_decompress(token).ok()
    }

    /// Decode a token, reporting the reason on failure.
    pub fn try_decompress(token: &str) -> Result<Self, SyncError> {
        let compressed = URL_SAFE_NO_PAD.decode(token.trim())?;

        let mut json = Vec::new();
        DeflateDecoder::new(compressed.as_slice())
            .take(MAX_PAYLOAD_SIZE as u64 + 1)
            .read_to_end(&mut json)
            .map_err(SyncError::Compression)?;
        if json.len() > MAX_PAYLOAD_SIZE {
            return Err(SyncError::PayloadTooLarge {
                limit: MAX_PAYLOAD_SIZE,
            });
        }

        let data: Self = serde_json::from_slice(&json).map_err(SyncError::Deserialization)?;
        if data.version != SYNC_DATA_VERSION {
            return Err(SyncError::UnsupportedVersion(data.version));
        }
        Ok(data)
    }
}
