//! Durable audio storage with sidecar metadata.
//!
//! Audio blobs are persisted through a pluggable [`StorageBackend`]
//! (filesystem or memory) behind the [`AudioStore`] facade, which enforces the
//! size ceiling, id validation and range bounds.

mod backend;
mod filesystem;
mod memory;
mod store;

pub use backend::{AudioFileRecord, Result, StorageBackend, StorageError};
pub use filesystem::FilesystemBackend;
pub use memory::MemoryBackend;
pub use store::{AudioMetadata, AudioStore, DEFAULT_MAX_FILE_BYTES, StorageConfig, validate_id};
