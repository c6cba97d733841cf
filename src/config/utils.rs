use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::core::tts::ProviderKind;

/// Environment variable prefix for a provider, e.g. `DEEPGRAM` in `DEEPGRAM_API_KEY`
pub fn env_prefix(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::ElevenLabs => "ELEVENLABS",
        ProviderKind::Deepgram => "DEEPGRAM",
        ProviderKind::Azure => "AZURE_SPEECH",
    }
}

/// Read an environment variable, treating blank values as unset
pub fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse an environment variable.
///
/// Unset or blank is `Ok(None)`; a value that does not parse is an error
/// naming the variable.
pub fn env_parsed<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {name} environment variable '{raw}': {e}").into()),
        None => Ok(None),
    }
}
