//! Error types for conversion orchestration

use crate::core::storage::StorageError;
use crate::core::tts::ProviderError;

/// Terminal reason a conversion did not produce audio
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A failed conversion together with the id it was tracked under
#[derive(Debug, thiserror::Error)]
#[error("Conversion {id} failed: {source}")]
pub struct ConversionFailure {
    pub id: String,
    #[source]
    pub source: ConversionError,
}

/// Lookup errors for status and result queries
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Conversion not found: {0}")]
    NotFound(String),
}
