//! # Conversion Orchestrator
//!
//! Central coordinator turning text into stored audio. The [`Orchestrator`]
//! owns the provider registry, probes availability concurrently, tries
//! available providers sequentially in priority order under per-provider
//! deadlines, persists the first successful result through the
//! [`AudioStore`](crate::core::storage::AudioStore) and tracks every
//! conversion in an in-memory status table.
//!
//! ```text
//! Pending ──► Processing ──► Completed
//!    │             │
//!    └─────────────┴──────► Failed
//! ```

pub mod errors;
pub mod manager;
pub mod observer;
pub mod status;

#[cfg(test)]
mod tests;

pub use errors::{ConversionError, ConversionFailure, OrchestratorError};
pub use manager::{ConversionOutcome, MAX_CONTENT_LENGTH, Orchestrator, OrchestratorConfig};
pub use observer::{AttemptEvent, AttemptObserver, AttemptOutcome, TracingObserver};
pub use status::{ConversionState, ConversionStatus, StatusTable};
