use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::tts::AudioFormat;

/// Errors that can occur during storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Audio not found: {0}")]
    NotFound(String),

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Range {start}-{end} not satisfiable for {size} bytes")]
    RangeNotSatisfiable { start: u64, end: u64, size: u64 },

    #[error("Invalid audio id: {0}")]
    InvalidId(String),

    #[error("Failed to persist audio: {0}")]
    WriteFailure(String),

    /// I/O error occurred during filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sidecar metadata could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Sidecar metadata describing one persisted audio blob.
///
/// `size` always equals the number of bytes persisted for the blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AudioFileRecord {
    pub id: String,
    /// Backend-specific key derived from the id
    pub storage_key: String,
    pub format: AudioFormat,
    pub size: u64,
    /// Estimated duration in seconds
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

/// Trait defining the interface for audio storage backends.
///
/// Backends address records by id and never validate bounds themselves;
/// [`super::AudioStore`] performs validation before delegating.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Persist `data` and its record. The record becomes visible only once the
    /// blob is fully written.
    async fn write(&self, record: &AudioFileRecord, data: Bytes) -> Result<()>;

    /// Read the whole blob.
    async fn read(&self, id: &str) -> Result<Bytes>;

    /// Read the inclusive span `start..=end` of the blob.
    async fn read_range(&self, id: &str, start: u64, end: u64) -> Result<Bytes>;

    /// Fetch the sidecar record, `None` when absent.
    async fn metadata(&self, id: &str) -> Result<Option<AudioFileRecord>>;

    /// Remove blob and record. Returns true if anything was removed.
    async fn remove(&self, id: &str) -> Result<bool>;

    /// Enumerate all committed records.
    async fn list(&self) -> Result<Vec<AudioFileRecord>>;

    /// Key under which `id` is stored
    fn storage_key(&self, id: &str) -> String;

    /// Returns the backend type as a string identifier.
    fn backend_type(&self) -> &str;
}
