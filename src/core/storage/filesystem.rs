use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_128;

use super::backend::{AudioFileRecord, Result, StorageBackend, StorageError};

const AUDIO_EXTENSION: &str = "audio";
const META_EXTENSION: &str = "meta";

/// Filesystem-based audio backend.
///
/// Layout: `{base}/{hash[0..2]}/{hash}.audio` with a JSON sidecar
/// `{hash}.meta`, where `hash` is the xxh3-128 of the id. Both files are
/// written to a unique temp file and renamed into place; the sidecar is
/// committed last so a visible record always has a complete blob.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Creates the backend, creating `base_path` if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn hash(id: &str) -> String {
        format!("{:032x}", xxh3_128(id.as_bytes()))
    }

    fn entry_path(&self, id: &str, extension: &str) -> PathBuf {
        let hash = Self::hash(id);
        self.base_path
            .join(&hash[0..2])
            .join(format!("{hash}.{extension}"))
    }

    async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(data).await?;
        file.sync_all().await
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

        let written = match Self::write_file(&temp_path, data).await {
            Ok(()) => fs::rename(&temp_path, path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read_record(path: &Path) -> Result<Option<AudioFileRecord>> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_if_present(path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn not_found_as(id: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(id.to_string())
    } else {
        e.into()
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, record: &AudioFileRecord, data: Bytes) -> Result<()> {
        let audio_path = self.entry_path(&record.id, AUDIO_EXTENSION);
        let meta_path = self.entry_path(&record.id, META_EXTENSION);

        if let Some(parent) = audio_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        Self::write_atomic(&audio_path, &data).await?;

        let committed = match serde_json::to_vec(record) {
            Ok(meta_json) => Self::write_atomic(&meta_path, &meta_json).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = committed {
            // Without a sidecar the blob is invisible to the age sweep.
            if let Err(remove_err) = fs::remove_file(&audio_path).await {
                warn!("Failed to remove orphaned audio {:?}: {}", audio_path, remove_err);
            }
            return Err(e);
        }

        debug!("Stored {} ({} bytes) at {:?}", record.id, data.len(), audio_path);
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Bytes> {
        if Self::read_record(&self.entry_path(id, META_EXTENSION))
            .await?
            .is_none()
        {
            return Err(StorageError::NotFound(id.to_string()));
        }

        fs::read(self.entry_path(id, AUDIO_EXTENSION))
            .await
            .map(Bytes::from)
            .map_err(|e| not_found_as(id, e))
    }

    async fn read_range(&self, id: &str, start: u64, end: u64) -> Result<Bytes> {
        let mut file = fs::File::open(self.entry_path(id, AUDIO_EXTENSION))
            .await
            .map_err(|e| not_found_as(id, e))?;

        let size = file.metadata().await?.len();
        if start > end || end >= size {
            return Err(StorageError::RangeNotSatisfiable { start, end, size });
        }

        file.seek(SeekFrom::Start(start)).await?;
        let mut buffer = vec![0u8; (end - start + 1) as usize];
        file.read_exact(&mut buffer).await?;
        Ok(Bytes::from(buffer))
    }

    async fn metadata(&self, id: &str) -> Result<Option<AudioFileRecord>> {
        Self::read_record(&self.entry_path(id, META_EXTENSION)).await
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        // Sidecar first so readers stop seeing the record before the blob goes.
        let meta_removed = Self::remove_if_present(&self.entry_path(id, META_EXTENSION)).await?;
        let audio_removed = Self::remove_if_present(&self.entry_path(id, AUDIO_EXTENSION)).await?;
        Ok(meta_removed || audio_removed)
    }

    async fn list(&self) -> Result<Vec<AudioFileRecord>> {
        let mut records = Vec::new();
        let mut shards = fs::read_dir(&self.base_path).await?;

        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }

            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(META_EXTENSION) {
                    continue;
                }

                match Self::read_record(&path).await {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {}
                    Err(e) => warn!("Skipping unreadable sidecar {:?}: {}", path, e),
                }
            }
        }

        Ok(records)
    }

    fn storage_key(&self, id: &str) -> String {
        Self::hash(id)
    }

    fn backend_type(&self) -> &str {
        "filesystem"
    }
}
