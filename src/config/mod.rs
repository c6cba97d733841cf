//! Configuration module for the voxrelay server
//!
//! This module handles server configuration from various sources: YAML files and
//! environment variables. The configuration is split into logical submodules:
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use voxrelay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable fallback
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::core::cleanup::CleanupSchedule;
use crate::core::storage::StorageConfig;
use crate::core::tts::{ProviderConfig, ProviderKind};

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use utils::env_prefix;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_MAX_FILE_BYTES: usize = crate::core::storage::DEFAULT_MAX_FILE_BYTES;
pub const DEFAULT_AUDIO_MAX_AGE_HOURS: u64 = 24;
pub const DEFAULT_STATUS_MAX_AGE_MINUTES: u64 = 60;
pub const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 3600;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3000;

/// Server configuration
///
/// Contains everything needed to run the server:
/// - Server settings (host, port, environment)
/// - Audio storage location and limits
/// - Cleanup schedule
/// - Configured TTS providers
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `development` enables diagnostic details in error responses
    pub environment: String,

    // Storage (filesystem when a path is set, memory otherwise)
    pub storage_path: Option<PathBuf>,
    pub storage_max_file_bytes: usize,
    pub audio_max_age_hours: u64,

    // Cleanup
    pub status_max_age_minutes: u64,
    /// 0 disables the background sweep
    pub cleanup_interval_seconds: u64,

    // TTS
    pub probe_timeout_ms: u64,
    /// Providers with an API key, in declaration order
    pub providers: Vec<ProviderConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            environment: "production".to_string(),
            storage_path: None,
            storage_max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            audio_max_age_hours: DEFAULT_AUDIO_MAX_AGE_HOURS,
            status_max_age_minutes: DEFAULT_STATUS_MAX_AGE_MINUTES,
            cleanup_interval_seconds: DEFAULT_CLEANUP_INTERVAL_SECONDS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            providers: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable fallback
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables
    /// 3. Default values
    ///
    /// The `.env` file is not read here; the YAML file is the source of truth
    /// and only real environment variables fill its gaps.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            path: self.storage_path.clone(),
            max_file_bytes: self.storage_max_file_bytes,
        }
    }

    pub fn cleanup_schedule(&self) -> CleanupSchedule {
        CleanupSchedule {
            interval: Duration::from_secs(self.cleanup_interval_seconds),
            status_max_age_minutes: self.status_max_age_minutes,
            audio_max_age_hours: self.audio_max_age_hours,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Settings for one provider, if it is configured
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.kind == kind)
    }
}
