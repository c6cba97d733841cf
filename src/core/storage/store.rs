use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info, warn};

use super::backend::{AudioFileRecord, Result, StorageBackend, StorageError};
use super::filesystem::FilesystemBackend;
use super::memory::MemoryBackend;
use crate::core::tts::AudioFormat;

/// Default ceiling for a single stored file
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Storage configuration options.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// Directory for the filesystem backend; `None` selects the memory backend
    pub path: Option<PathBuf>,
    pub max_file_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Caller-supplied description of the audio being saved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioMetadata {
    pub format: AudioFormat,
    pub duration: f64,
}

/// Reject ids that are empty or could escape a storage namespace
pub fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
        return Err(StorageError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Audio store with a pluggable backend.
pub struct AudioStore {
    backend: Arc<dyn StorageBackend>,
    max_file_bytes: usize,
}

impl AudioStore {
    pub fn new(backend: Arc<dyn StorageBackend>, max_file_bytes: usize) -> Self {
        Self {
            backend,
            max_file_bytes,
        }
    }

    /// Creates a store from configuration.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        let backend: Arc<dyn StorageBackend> = match &config.path {
            Some(path) => {
                info!("Using filesystem audio storage at {:?}", path);
                Arc::new(FilesystemBackend::new(path.clone()).await?)
            }
            None => {
                warn!("STORAGE_PATH not set; audio is kept in memory and lost on restart");
                Arc::new(MemoryBackend::new())
            }
        };
        Ok(Self::new(backend, config.max_file_bytes))
    }

    /// Store backed by memory, mainly for tests
    pub fn in_memory(max_file_bytes: usize) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), max_file_bytes)
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    /// Returns the backend type identifier.
    pub fn backend_type(&self) -> &str {
        self.backend.backend_type()
    }

    /// Persist audio for `id`.
    ///
    /// The size ceiling is checked before anything is written. Backend
    /// failures surface as [`StorageError::WriteFailure`].
    pub async fn save(
        &self,
        id: &str,
        data: Bytes,
        metadata: AudioMetadata,
    ) -> Result<AudioFileRecord> {
        validate_id(id)?;

        if data.len() > self.max_file_bytes {
            return Err(StorageError::PayloadTooLarge {
                size: data.len(),
                limit: self.max_file_bytes,
            });
        }

        let record = AudioFileRecord {
            id: id.to_string(),
            storage_key: self.backend.storage_key(id),
            format: metadata.format,
            size: data.len() as u64,
            duration: metadata.duration,
            created_at: Utc::now(),
        };

        self.backend
            .write(&record, data)
            .await
            .map_err(|e| StorageError::WriteFailure(e.to_string()))?;

        debug!("Saved audio {} ({} bytes)", id, record.size);
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<Bytes> {
        validate_id(id)?;
        self.backend.read(id).await
    }

    /// Read the inclusive byte span `start..=end`.
    pub async fn get_range(&self, id: &str, start: u64, end: u64) -> Result<Bytes> {
        let record = self.require_metadata(id).await?;
        if start > end || end >= record.size {
            return Err(StorageError::RangeNotSatisfiable {
                start,
                end,
                size: record.size,
            });
        }
        self.backend.read_range(id, start, end).await
    }

    pub async fn get_metadata(&self, id: &str) -> Result<Option<AudioFileRecord>> {
        validate_id(id)?;
        self.backend.metadata(id).await
    }

    /// Like [`Self::get_metadata`] but absent records are [`StorageError::NotFound`]
    pub async fn require_metadata(&self, id: &str) -> Result<AudioFileRecord> {
        self.get_metadata(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.get_metadata(id).await?.is_some())
    }

    /// Delete `id`. Returns true iff something was removed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        validate_id(id)?;
        let removed = self.backend.remove(id).await?;
        if removed {
            debug!("Deleted audio {}", id);
        }
        Ok(removed)
    }

    /// Remove records older than `max_age_hours`. Returns the number removed.
    pub async fn cleanup(&self, max_age_hours: u64) -> Result<usize> {
        let Some(cutoff) = i64::try_from(max_age_hours)
            .ok()
            .and_then(ChronoDuration::try_hours)
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            debug!("Audio max age of {}h is out of range; nothing is old enough", max_age_hours);
            return Ok(0);
        };
        self.cleanup_older_than(cutoff).await
    }

    /// Remove records created strictly before `cutoff`.
    ///
    /// A failure removing one record is logged and the sweep continues.
    pub async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;

        for record in self.backend.list().await? {
            if record.created_at >= cutoff {
                continue;
            }
            match self.backend.remove(&record.id).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!("Failed to remove expired audio {}: {}", record.id, e),
            }
        }

        if removed > 0 {
            info!("Audio cleanup removed {} file(s)", removed);
        }
        Ok(removed)
    }
}
