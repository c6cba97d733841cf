use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::core::tts::ConversionResult;

/// Lifecycle state of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ConversionState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ConversionState {
    /// Completed and Failed are absorbing
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversionState::Completed | ConversionState::Failed)
    }
}

/// Snapshot of one conversion's progress
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ConversionStatus {
    pub id: String,
    pub state: ConversionState,
    /// 0 to 100
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

struct StatusEntry {
    status: ConversionStatus,
    result: Option<Arc<ConversionResult>>,
}

/// Concurrency-safe table of conversion statuses and results.
///
/// All mutation goes through methods that enforce the state machine:
/// progress never decreases and terminal states are never left.
#[derive(Default)]
pub struct StatusTable {
    entries: RwLock<HashMap<String, StatusEntry>>,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new Pending conversion. An existing id is left untouched.
    pub fn create(&self, id: &str) -> ConversionStatus {
        let mut entries = self.entries.write();
        let entry = entries.entry(id.to_string()).or_insert_with(|| StatusEntry {
            status: ConversionStatus {
                id: id.to_string(),
                state: ConversionState::Pending,
                progress: 0,
                error: None,
                start_time: Utc::now(),
                end_time: None,
            },
            result: None,
        });
        entry.status.clone()
    }

    /// Apply `f` to a non-terminal status. Returns false when the id is
    /// unknown or already terminal.
    fn update(&self, id: &str, f: impl FnOnce(&mut StatusEntry)) -> bool {
        let mut entries = self.entries.write();
        match entries.get_mut(id) {
            Some(entry) if !entry.status.state.is_terminal() => {
                f(entry);
                true
            }
            _ => false,
        }
    }

    pub fn mark_processing(&self, id: &str) -> bool {
        self.update(id, |entry| entry.status.state = ConversionState::Processing)
    }

    /// Raise progress; lower values are ignored.
    pub fn advance(&self, id: &str, progress: u8) -> bool {
        self.update(id, |entry| {
            entry.status.progress = entry.status.progress.max(progress.min(99));
        })
    }

    pub fn complete(&self, id: &str, result: Arc<ConversionResult>) -> bool {
        self.update(id, |entry| {
            entry.status.state = ConversionState::Completed;
            entry.status.progress = 100;
            entry.status.end_time = Some(Utc::now());
            entry.result = Some(result);
        })
    }

    /// Move to Failed. Progress resets to 0 since no audio was produced.
    pub fn fail(&self, id: &str, error: impl Into<String>) -> bool {
        let error = error.into();
        self.update(id, |entry| {
            entry.status.state = ConversionState::Failed;
            entry.status.progress = 0;
            entry.status.error = Some(error);
            entry.status.end_time = Some(Utc::now());
        })
    }

    pub fn get(&self, id: &str) -> Option<ConversionStatus> {
        self.entries.read().get(id).map(|e| e.status.clone())
    }

    pub fn result(&self, id: &str) -> Option<Arc<ConversionResult>> {
        self.entries.read().get(id).and_then(|e| e.result.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop entries that started strictly before `cutoff`
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.status.start_time >= cutoff);
        before - entries.len()
    }
}
