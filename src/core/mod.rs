pub mod cleanup;
pub mod orchestrator;
pub mod state;
pub mod storage;
pub mod tts;

// Re-export commonly used types for convenience
pub use orchestrator::{
    ConversionError, ConversionOutcome, ConversionState, ConversionStatus, Orchestrator,
    OrchestratorConfig,
};

pub use storage::{AudioFileRecord, AudioStore, StorageError};

pub use tts::{
    AudioFormat, AudioSettings, ConversionResult, PartialAudioSettings, ProviderError,
    ProviderErrorKind, ProviderKind, ProviderRegistry, TtsProvider,
};

// Re-export CoreState for external use
pub use state::CoreState;
