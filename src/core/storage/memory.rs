use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::backend::{AudioFileRecord, Result, StorageBackend, StorageError};

/// In-process backend. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, (AudioFileRecord, Bytes)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn write(&self, record: &AudioFileRecord, data: Bytes) -> Result<()> {
        // Record and bytes are inserted together under one lock.
        self.entries
            .write()
            .insert(record.id.clone(), (record.clone(), data));
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Bytes> {
        self.entries
            .read()
            .get(id)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn read_range(&self, id: &str, start: u64, end: u64) -> Result<Bytes> {
        let data = self.read(id).await?;
        let size = data.len() as u64;
        if start > end || end >= size {
            return Err(StorageError::RangeNotSatisfiable { start, end, size });
        }
        Ok(data.slice(start as usize..=end as usize))
    }

    async fn metadata(&self, id: &str) -> Result<Option<AudioFileRecord>> {
        Ok(self.entries.read().get(id).map(|(record, _)| record.clone()))
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.entries.write().remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<AudioFileRecord>> {
        Ok(self
            .entries
            .read()
            .values()
            .map(|(record, _)| record.clone())
            .collect())
    }

    fn storage_key(&self, id: &str) -> String {
        id.to_string()
    }

    fn backend_type(&self) -> &str {
        "memory"
    }
}
