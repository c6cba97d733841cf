use super::ServerConfig;
use crate::core::tts::ProviderConfig;

/// Validate a merged configuration
///
/// # Errors
/// Returns the first problem found:
/// - `port` is 0
/// - `probe_timeout_ms` or `storage_max_file_bytes` is 0
/// - a provider has a blank API key, a non-finite priority or a zero timeout
pub fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.port == 0 {
        return Err("Invalid server port: 0 (port must be between 1 and 65535)".into());
    }

    if config.probe_timeout_ms == 0 {
        return Err("probe_timeout_ms must be greater than 0".into());
    }

    if config.storage_max_file_bytes == 0 {
        return Err("storage max_file_bytes must be greater than 0".into());
    }

    for provider in &config.providers {
        validate_provider(provider)?;
    }

    Ok(())
}

/// Validate one provider entry
pub fn validate_provider(provider: &ProviderConfig) -> Result<(), Box<dyn std::error::Error>> {
    let name = provider.kind.as_str();

    if provider.api_key.trim().is_empty() {
        return Err(format!("{name}: api_key cannot be empty").into());
    }

    if !provider.priority.is_finite() {
        return Err(format!("{name}: priority must be a finite number").into());
    }

    if provider.timeout.is_zero() {
        return Err(format!("{name}: timeout_ms must be greater than 0").into());
    }

    if let Some(url) = &provider.base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        return Err(format!("{name}: base_url must start with http:// or https://, got '{url}'").into());
    }

    Ok(())
}
