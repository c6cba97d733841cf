use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::base::{ProviderStatus, TtsProvider};

/// A provider together with its ordering key and attempt deadline
#[derive(Clone)]
pub struct RegisteredProvider {
    pub provider: Arc<dyn TtsProvider>,
    /// Ordering key only; lower is tried first
    pub priority: f64,
    /// Deadline for a single `convert` attempt
    pub attempt_timeout: Duration,
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("name", &self.provider.name())
            .field("priority", &self.priority)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

/// Public view of a registered provider
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub name: String,
    pub priority: f64,
    pub status: ProviderStatus,
}

/// Immutable, priority-ordered set of providers.
///
/// Ordering is a stable ascending sort on `priority`, so equal priorities keep
/// registration order. The order never changes after construction.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    pub fn new(mut entries: Vec<RegisteredProvider>) -> Self {
        entries.sort_by(|a, b| a.priority.total_cmp(&b.priority));
        Self { entries }
    }

    pub fn entries(&self) -> &[RegisteredProvider] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.provider.name().to_string())
            .collect()
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.entries
            .iter()
            .map(|e| ProviderDescriptor {
                name: e.provider.name().to_string(),
                priority: e.priority,
                status: e.provider.get_status(),
            })
            .collect()
    }
}
