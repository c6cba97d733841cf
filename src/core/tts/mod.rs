pub mod azure;
mod base;
pub mod deepgram;
pub mod elevenlabs;
pub mod provider;
pub mod registry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use azure::AzureRequestBuilder;
pub use base::{
    AudioFormat, AudioSettings, ConversionResult, MAX_PLAYBACK_SPEED, MAX_VOLUME,
    MIN_PLAYBACK_SPEED, PartialAudioSettings, ProviderError, ProviderErrorKind, ProviderResult,
    ProviderStatus, ResultMetadata, TtsProvider, estimate_duration,
};
pub use deepgram::{DEEPGRAM_API_URL, DeepgramRequestBuilder};
pub use elevenlabs::{ELEVENLABS_API_URL, ElevenLabsRequestBuilder};
pub use provider::{HttpSynthesizer, SynthesisRequestBuilder};
pub use registry::{ProviderDescriptor, ProviderRegistry, RegisteredProvider};

use crate::utils::req_manager::ReqManager;

pub type ElevenLabsTts = HttpSynthesizer<ElevenLabsRequestBuilder>;
pub type DeepgramTts = HttpSynthesizer<DeepgramRequestBuilder>;
pub type AzureTts = HttpSynthesizer<AzureRequestBuilder>;

/// Closed set of supported synthesis backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    ElevenLabs,
    Deepgram,
    Azure,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::ElevenLabs,
        ProviderKind::Deepgram,
        ProviderKind::Azure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::ElevenLabs => "elevenlabs",
            ProviderKind::Deepgram => "deepgram",
            ProviderKind::Azure => "azure",
        }
    }

    /// Attempt deadline used when none is configured
    pub fn default_timeout(&self) -> Duration {
        match self {
            ProviderKind::ElevenLabs => Duration::from_secs(30),
            ProviderKind::Deepgram => Duration::from_secs(20),
            ProviderKind::Azure => Duration::from_secs(20),
        }
    }

    /// Priority used when none is configured
    pub fn default_priority(&self) -> f64 {
        match self {
            ProviderKind::ElevenLabs => 1.0,
            ProviderKind::Deepgram => 2.0,
            ProviderKind::Azure => 3.0,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elevenlabs" | "eleven-labs" => Ok(ProviderKind::ElevenLabs),
            "deepgram" => Ok(ProviderKind::Deepgram),
            "azure" | "microsoft-azure" => Ok(ProviderKind::Azure),
            other => Err(format!(
                "Unsupported TTS provider: {other}. Supported providers: elevenlabs, deepgram, azure"
            )),
        }
    }
}

/// Per-provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub priority: f64,
    pub timeout: Duration,
    /// Endpoint override, mainly for tests and proxies
    pub base_url: Option<String>,
    /// Azure region, ignored by the other backends
    pub region: Option<String>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            priority: kind.default_priority(),
            timeout: kind.default_timeout(),
            base_url: None,
            region: None,
        }
    }
}

/// Factory building a registry entry for one configured provider.
///
/// All providers share `req_manager` so outbound concurrency is bounded
/// process-wide.
pub fn create_provider(
    config: &ProviderConfig,
    req_manager: Arc<ReqManager>,
    probe_timeout: Duration,
) -> RegisteredProvider {
    let provider: Arc<dyn TtsProvider> = match config.kind {
        ProviderKind::ElevenLabs => Arc::new(ElevenLabsTts::new(
            ElevenLabsRequestBuilder::new(&config.api_key, config.base_url.clone()),
            req_manager,
            probe_timeout,
        )),
        ProviderKind::Deepgram => Arc::new(DeepgramTts::new(
            DeepgramRequestBuilder::new(&config.api_key, config.base_url.clone()),
            req_manager,
            probe_timeout,
        )),
        ProviderKind::Azure => Arc::new(AzureTts::new(
            AzureRequestBuilder::new(
                &config.api_key,
                config.region.as_deref(),
                config.base_url.clone(),
            ),
            req_manager,
            probe_timeout,
        )),
    };

    RegisteredProvider {
        provider,
        priority: config.priority,
        attempt_timeout: config.timeout,
    }
}

/// Build the full registry from configured providers
pub fn build_registry(
    configs: &[ProviderConfig],
    req_manager: Arc<ReqManager>,
    probe_timeout: Duration,
) -> ProviderRegistry {
    ProviderRegistry::new(
        configs
            .iter()
            .map(|c| create_provider(c, Arc::clone(&req_manager), probe_timeout))
            .collect(),
    )
}
