use serde::Deserialize;
use std::path::PathBuf;

use crate::core::tts::ProviderKind;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Environment
/// variables fill in whatever the file leaves out.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   environment: "production"
///
/// storage:
///   path: "/var/lib/voxrelay/audio"
///   max_file_bytes: 10485760
///   max_age_hours: 24
///
/// cleanup:
///   interval_seconds: 3600
///   status_max_age_minutes: 60
///
/// tts:
///   probe_timeout_ms: 3000
///   providers:
///     elevenlabs:
///       api_key: "your-elevenlabs-key"
///       priority: 1
///       timeout_ms: 30000
///     deepgram:
///       api_key: "your-deepgram-key"
///       priority: 2
///     azure:
///       api_key: "your-azure-speech-key"
///       region: "eastus"
///       priority: 2.5
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub storage: Option<StorageYaml>,
    pub cleanup: Option<CleanupYaml>,
    pub tts: Option<TtsYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub environment: Option<String>,
}

/// Audio storage configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageYaml {
    pub path: Option<String>,
    pub max_file_bytes: Option<usize>,
    pub max_age_hours: Option<u64>,
}

/// Background cleanup configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CleanupYaml {
    pub interval_seconds: Option<u64>,
    pub status_max_age_minutes: Option<u64>,
}

/// TTS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TtsYaml {
    pub probe_timeout_ms: Option<u64>,
    pub providers: Option<ProvidersYaml>,
}

/// Per-provider sections from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub elevenlabs: Option<ProviderYaml>,
    pub deepgram: Option<ProviderYaml>,
    pub azure: Option<ProviderYaml>,
}

impl ProvidersYaml {
    pub fn get(&self, kind: ProviderKind) -> Option<&ProviderYaml> {
        match kind {
            ProviderKind::ElevenLabs => self.elevenlabs.as_ref(),
            ProviderKind::Deepgram => self.deepgram.as_ref(),
            ProviderKind::Azure => self.azure.as_ref(),
        }
    }
}

/// Settings for one provider from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProviderYaml {
    pub api_key: Option<String>,
    pub priority: Option<f64>,
    pub timeout_ms: Option<u64>,
    pub base_url: Option<String>,
    /// Azure only
    pub region: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }

    /// YAML section for `kind`, if present
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderYaml> {
        self.tts
            .as_ref()
            .and_then(|t| t.providers.as_ref())
            .and_then(|p| p.get(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
server:
  port: 9000

tts:
  providers:
    elevenlabs:
      api_key: "el-key"
      priority: 1.5
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(config.server.as_ref().unwrap().host.is_none());
        assert_eq!(config.server.as_ref().unwrap().port, Some(9000));
        assert!(config.storage.is_none());

        let el = config.provider(ProviderKind::ElevenLabs).unwrap();
        assert_eq!(el.api_key.as_deref(), Some("el-key"));
        assert_eq!(el.priority, Some(1.5));
        assert!(config.provider(ProviderKind::Deepgram).is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("").unwrap();

        assert!(config.server.is_none());
        assert!(config.storage.is_none());
        assert!(config.cleanup.is_none());
        assert!(config.tts.is_none());
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }

    #[test]
    fn test_integer_priority_is_accepted() {
        let yaml = r#"
tts:
  providers:
    azure:
      priority: 2
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider(ProviderKind::Azure).unwrap().priority, Some(2.0));
    }
}
