use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::core::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::core::storage::AudioStore;
use crate::core::tts::build_registry;
use crate::utils::req_manager::ReqManager;

/// Concurrent outbound requests shared by all providers
const PROVIDER_CONCURRENCY: usize = 16;

/// Core-specific shared state for the application.
///
/// Holds resources owned by the core layer: the pooled HTTP client used by
/// every provider and the orchestrator that owns the registry and the
/// audio store.
#[derive(Clone)]
pub struct CoreState {
    pub req_manager: Arc<ReqManager>,
    pub orchestrator: Arc<Orchestrator>,
}

impl CoreState {
    /// Initialize core state from the server configuration.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be built or the storage directory
    /// cannot be created.
    pub async fn new(
        config: &ServerConfig,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let req_manager = Arc::new(ReqManager::new(PROVIDER_CONCURRENCY)?);

        let registry = build_registry(
            &config.providers,
            Arc::clone(&req_manager),
            config.probe_timeout(),
        );
        info!(
            "Registered {} TTS provider(s): {:?}",
            registry.len(),
            registry.names()
        );

        let store = Arc::new(AudioStore::from_config(&config.storage_config()).await?);
        info!("Audio storage backend: {}", store.backend_type());

        let orchestrator = Orchestrator::new(
            registry,
            store,
            OrchestratorConfig {
                probe_timeout: config.probe_timeout(),
            },
        );

        Ok(Arc::new(Self {
            req_manager,
            orchestrator: Arc::new(orchestrator),
        }))
    }

    /// Wrap an already built orchestrator, used by tests with mock providers
    pub fn with_orchestrator(orchestrator: Arc<Orchestrator>) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Arc::new(Self {
            req_manager: Arc::new(ReqManager::new(1)?),
            orchestrator,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::{ProviderConfig, ProviderKind};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_new_builds_registry_and_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            storage_path: Some(temp_dir.path().to_path_buf()),
            providers: vec![
                ProviderConfig::new(ProviderKind::Azure, "az"),
                ProviderConfig::new(ProviderKind::ElevenLabs, "el"),
            ],
            ..Default::default()
        };

        let state = CoreState::new(&config).await.unwrap();
        assert_eq!(
            state.orchestrator.provider_names(),
            vec!["elevenlabs".to_string(), "azure".to_string()]
        );
        assert_eq!(state.orchestrator.store().backend_type(), "filesystem");
    }

    #[tokio::test]
    async fn test_memory_store_without_path() {
        let state = CoreState::new(&ServerConfig::default()).await.unwrap();
        assert!(state.orchestrator.provider_names().is_empty());
        assert_eq!(state.orchestrator.store().backend_type(), "memory");
    }
}
