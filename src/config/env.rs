use super::ServerConfig;
use super::merge::merge_config;
use super::utils::{env_parsed, env_prefix, env_string};
use super::validation::validate;
use crate::core::tts::ProviderKind;

/// Provider settings read from `{PREFIX}_*` environment variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderEnv {
    pub api_key: Option<String>,
    pub priority: Option<f64>,
    pub timeout_ms: Option<u64>,
    pub base_url: Option<String>,
    pub region: Option<String>,
}

impl ProviderEnv {
    /// Read the variables for `kind`.
    ///
    /// `AZURE_SPEECH_REGION` is only consulted for Azure.
    pub fn read(kind: ProviderKind) -> Result<Self, Box<dyn std::error::Error>> {
        let prefix = env_prefix(kind);

        Ok(Self {
            api_key: env_string(&format!("{prefix}_API_KEY")),
            priority: env_parsed(&format!("{prefix}_PRIORITY"))?,
            timeout_ms: env_parsed(&format!("{prefix}_TIMEOUT_MS"))?,
            base_url: env_string(&format!("{prefix}_BASE_URL")),
            region: match kind {
                ProviderKind::Azure => env_string("AZURE_SPEECH_REGION"),
                _ => None,
            },
        })
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads configuration from environment variables, with sensible defaults.
    /// Also loads from .env file if present using dotenvy.
    ///
    /// # Errors
    /// Returns an error if:
    /// - A numeric environment variable is malformed
    /// - The resulting configuration fails validation
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = merge_config(None)?;
        validate(&config)?;
        Ok(config)
    }
}
