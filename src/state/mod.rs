use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::CoreState;
use crate::core::orchestrator::Orchestrator;
use crate::core::storage::AudioStore;

/// Application state that can be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// Core layer state that holds the orchestrator and shared HTTP client
    pub core_state: Arc<CoreState>,
}

impl AppState {
    pub async fn new(
        config: ServerConfig,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let core_state = CoreState::new(&config).await?;
        Ok(Arc::new(Self { config, core_state }))
    }

    /// Build state around an existing orchestrator
    pub fn with_orchestrator(
        config: ServerConfig,
        orchestrator: Arc<Orchestrator>,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let core_state = CoreState::with_orchestrator(orchestrator)?;
        Ok(Arc::new(Self { config, core_state }))
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.core_state.orchestrator
    }

    /// Get a handle to the application's audio store
    pub fn store(&self) -> Arc<AudioStore> {
        self.core_state.orchestrator.store().clone()
    }
}
