use std::path::PathBuf;
use std::time::Duration;

use super::env::ProviderEnv;
use super::utils::{env_parsed, env_string};
use super::yaml::{ProviderYaml, YamlConfig};
use super::{
    DEFAULT_AUDIO_MAX_AGE_HOURS, DEFAULT_CLEANUP_INTERVAL_SECONDS, DEFAULT_MAX_FILE_BYTES,
    DEFAULT_PORT, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_STATUS_MAX_AGE_MINUTES, ServerConfig,
};
use crate::core::tts::{ProviderConfig, ProviderKind};

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. YAML configuration values
/// 2. Environment variables
/// 3. Default values
///
/// This allows environment variables to provide base configuration while YAML
/// can override specific values for different deployment environments.
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();

    // Priority: YAML > ENV > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            match $yaml_value {
                Some(v) => v,
                None => env_parsed($env_var)?.unwrap_or($default),
            }
        };
    }

    // Optional values: YAML > ENV
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            $yaml_value.or_else(|| env_string($env_var))
        };
    }

    let server = yaml.server.as_ref();
    let storage = yaml.storage.as_ref();
    let cleanup = yaml.cleanup.as_ref();
    let tts = yaml.tts.as_ref();

    let host = get_optional!("HOST", server.and_then(|s| s.host.clone()))
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let port = get_value!("PORT", server.and_then(|s| s.port), DEFAULT_PORT);
    let environment = get_optional!("ENVIRONMENT", server.and_then(|s| s.environment.clone()))
        .unwrap_or_else(|| "production".to_string());

    let storage_path =
        get_optional!("STORAGE_PATH", storage.and_then(|s| s.path.clone())).map(PathBuf::from);
    let storage_max_file_bytes = get_value!(
        "STORAGE_MAX_FILE_BYTES",
        storage.and_then(|s| s.max_file_bytes),
        DEFAULT_MAX_FILE_BYTES
    );
    let audio_max_age_hours = get_value!(
        "AUDIO_MAX_AGE_HOURS",
        storage.and_then(|s| s.max_age_hours),
        DEFAULT_AUDIO_MAX_AGE_HOURS
    );

    let status_max_age_minutes = get_value!(
        "STATUS_MAX_AGE_MINUTES",
        cleanup.and_then(|c| c.status_max_age_minutes),
        DEFAULT_STATUS_MAX_AGE_MINUTES
    );
    let cleanup_interval_seconds = get_value!(
        "CLEANUP_INTERVAL_SECONDS",
        cleanup.and_then(|c| c.interval_seconds),
        DEFAULT_CLEANUP_INTERVAL_SECONDS
    );

    let probe_timeout_ms = get_value!(
        "PROBE_TIMEOUT_MS",
        tts.and_then(|t| t.probe_timeout_ms),
        DEFAULT_PROBE_TIMEOUT_MS
    );

    let mut providers = Vec::new();
    for kind in ProviderKind::ALL {
        let env = ProviderEnv::read(kind)?;
        if let Some(provider) = merge_provider(kind, yaml.provider(kind), env) {
            providers.push(provider);
        }
    }

    Ok(ServerConfig {
        host,
        port,
        environment,
        storage_path,
        storage_max_file_bytes,
        audio_max_age_hours,
        status_max_age_minutes,
        cleanup_interval_seconds,
        probe_timeout_ms,
        providers,
    })
}

/// Merge one provider field by field; a provider without an API key is not registered
fn merge_provider(
    kind: ProviderKind,
    yaml: Option<&ProviderYaml>,
    env: ProviderEnv,
) -> Option<ProviderConfig> {
    let api_key = yaml
        .and_then(|y| y.api_key.clone())
        .filter(|k| !k.trim().is_empty())
        .or(env.api_key)?;

    let priority = yaml
        .and_then(|y| y.priority)
        .or(env.priority)
        .unwrap_or_else(|| kind.default_priority());
    let timeout = yaml
        .and_then(|y| y.timeout_ms)
        .or(env.timeout_ms)
        .map(Duration::from_millis)
        .unwrap_or_else(|| kind.default_timeout());

    Some(ProviderConfig {
        kind,
        api_key,
        priority,
        timeout,
        base_url: yaml.and_then(|y| y.base_url.clone()).or(env.base_url),
        region: yaml.and_then(|y| y.region.clone()).or(env.region),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env_prefix;
    use crate::config::yaml::{ProvidersYaml, ServerYaml, StorageYaml, TtsYaml};
    use serial_test::serial;
    use std::env;

    fn cleanup_env_vars() {
        unsafe {
            for var in [
                "HOST",
                "PORT",
                "ENVIRONMENT",
                "STORAGE_PATH",
                "STORAGE_MAX_FILE_BYTES",
                "AUDIO_MAX_AGE_HOURS",
                "STATUS_MAX_AGE_MINUTES",
                "CLEANUP_INTERVAL_SECONDS",
                "PROBE_TIMEOUT_MS",
                "AZURE_SPEECH_REGION",
            ] {
                env::remove_var(var);
            }
            for kind in ProviderKind::ALL {
                let prefix = env_prefix(kind);
                for suffix in ["API_KEY", "PRIORITY", "TIMEOUT_MS", "BASE_URL"] {
                    env::remove_var(format!("{prefix}_{suffix}"));
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_merge_defaults_when_no_yaml_or_env() {
        cleanup_env_vars();

        let config = merge_config(None).unwrap();

        assert_eq!(config, ServerConfig::default());
        assert!(config.providers.is_empty());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_yaml_overrides_env() {
        cleanup_env_vars();

        let yaml = YamlConfig {
            server: Some(ServerYaml {
                host: Some("127.0.0.1".to_string()),
                port: Some(8080),
                ..Default::default()
            }),
            ..Default::default()
        };

        unsafe {
            env::set_var("HOST", "10.0.0.1");
            env::set_var("PORT", "9000");
            env::set_var("ENVIRONMENT", "development");
        }

        let config = merge_config(Some(yaml)).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        // ENV fills the gap
        assert_eq!(config.environment, "development");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_env_only_storage() {
        cleanup_env_vars();
        unsafe {
            env::set_var("STORAGE_PATH", "/data/audio");
            env::set_var("STORAGE_MAX_FILE_BYTES", "1024");
            env::set_var("CLEANUP_INTERVAL_SECONDS", "0");
        }

        let config = merge_config(None).unwrap();
        assert_eq!(config.storage_path, Some(PathBuf::from("/data/audio")));
        assert_eq!(config.storage_max_file_bytes, 1024);
        assert_eq!(config.cleanup_interval_seconds, 0);

        let yaml = YamlConfig {
            storage: Some(StorageYaml {
                max_file_bytes: Some(4096),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = merge_config(Some(yaml)).unwrap();
        assert_eq!(config.storage_max_file_bytes, 4096);
        assert_eq!(config.storage_path, Some(PathBuf::from("/data/audio")));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_invalid_port_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let err = merge_config(None).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_provider_fields_independently() {
        cleanup_env_vars();
        unsafe {
            env::set_var("ELEVENLABS_API_KEY", "el-env");
            env::set_var("ELEVENLABS_TIMEOUT_MS", "12000");
            env::set_var("ELEVENLABS_PRIORITY", "7");
        }

        let yaml = YamlConfig {
            tts: Some(TtsYaml {
                providers: Some(ProvidersYaml {
                    elevenlabs: Some(ProviderYaml {
                        priority: Some(0.5),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = merge_config(Some(yaml)).unwrap();
        assert_eq!(config.providers.len(), 1);

        let el = config.provider(ProviderKind::ElevenLabs).unwrap();
        assert_eq!(el.api_key, "el-env");
        assert_eq!(el.priority, 0.5);
        assert_eq!(el.timeout, Duration::from_millis(12000));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_provider_without_key_is_skipped() {
        cleanup_env_vars();

        let yaml = YamlConfig {
            tts: Some(TtsYaml {
                providers: Some(ProvidersYaml {
                    deepgram: Some(ProviderYaml {
                        api_key: Some("  ".to_string()),
                        priority: Some(1.0),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = merge_config(Some(yaml)).unwrap();
        assert!(config.providers.is_empty());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_providers_keep_declaration_order() {
        cleanup_env_vars();
        unsafe {
            env::set_var("AZURE_SPEECH_API_KEY", "az");
            env::set_var("ELEVENLABS_API_KEY", "el");
        }

        let config = merge_config(None).unwrap();
        let kinds: Vec<_> = config.providers.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![ProviderKind::ElevenLabs, ProviderKind::Azure]);

        cleanup_env_vars();
    }
}
