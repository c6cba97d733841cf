//! # TTS Provider Contract
//!
//! This module defines the uniform contract every speech-synthesis backend
//! implements, together with the data types that flow between providers, the
//! orchestrator and the storage layer.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use voxrelay::core::tts::{AudioSettings, TtsProvider};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn speak(provider: &dyn TtsProvider) -> Result<(), voxrelay::core::tts::ProviderError> {
//!     if !provider.is_available().await {
//!         return Ok(());
//!     }
//!
//!     let settings = AudioSettings::default();
//!     let result = provider
//!         .convert("Hello, world!", &settings, CancellationToken::new())
//!         .await?;
//!
//!     println!(
//!         "{} produced {} bytes of {} ({:.2}s)",
//!         result.metadata.tts_service,
//!         result.audio_buffer.len(),
//!         result.format,
//!         result.duration
//!     );
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Minimum accepted playback speed multiplier
pub const MIN_PLAYBACK_SPEED: f32 = 0.8;
/// Maximum accepted playback speed multiplier
pub const MAX_PLAYBACK_SPEED: f32 = 1.5;
/// Maximum volume level
pub const MAX_VOLUME: u8 = 100;

/// Encoded audio container produced by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
        }
    }

    /// MIME type used for the `Content-Type` header
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Ogg => "audio/ogg",
        }
    }

    /// File extension, also used for download filenames
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" | "mpeg" => Ok(AudioFormat::Mp3),
            "wav" | "wave" => Ok(AudioFormat::Wav),
            "ogg" | "opus" => Ok(AudioFormat::Ogg),
            other => Err(format!("Unsupported audio format: {other}")),
        }
    }
}

/// Playback settings requested by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
    /// Volume level (0 to 100)
    pub volume: u8,
    /// Playback speed multiplier (0.8 to 1.5)
    pub playback_speed: f32,
    /// Voice identifier, interpreted by each provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: MAX_VOLUME,
            playback_speed: 1.0,
            voice: None,
        }
    }
}

/// Partially specified settings as received on the wire
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PartialAudioSettings {
    pub volume: Option<u8>,
    pub playback_speed: Option<f32>,
    pub voice: Option<String>,
}

impl AudioSettings {
    /// Fill the gaps of a partial settings object with defaults
    pub fn from_partial(partial: Option<PartialAudioSettings>) -> Self {
        let defaults = Self::default();
        match partial {
            Some(p) => Self {
                volume: p.volume.unwrap_or(defaults.volume),
                playback_speed: p.playback_speed.unwrap_or(defaults.playback_speed),
                voice: p.voice.filter(|v| !v.trim().is_empty()),
            },
            None => defaults,
        }
    }

    /// Check that every field lies in its accepted range
    pub fn validate(&self) -> Result<(), String> {
        if self.volume > MAX_VOLUME {
            return Err(format!(
                "volume must be between 0 and {MAX_VOLUME}, got {}",
                self.volume
            ));
        }
        if !self.playback_speed.is_finite()
            || self.playback_speed < MIN_PLAYBACK_SPEED
            || self.playback_speed > MAX_PLAYBACK_SPEED
        {
            return Err(format!(
                "playbackSpeed must be between {MIN_PLAYBACK_SPEED} and {MAX_PLAYBACK_SPEED}, got {}",
                self.playback_speed
            ));
        }
        Ok(())
    }
}

/// Provenance of a conversion result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    /// Name of the provider that produced the audio
    pub tts_service: String,
    /// Provider-specific voice that was actually used
    pub voice: String,
    pub timestamp: DateTime<Utc>,
}

/// Audio produced by a successful provider call
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub audio_buffer: Bytes,
    /// Estimated duration in seconds
    pub duration: f64,
    pub format: AudioFormat,
    pub metadata: ResultMetadata,
}

/// Failure category reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Timeout,
    ServiceError,
    ApiKeyInvalid,
    UnsupportedContent,
    Unknown,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::ServiceError => "service_error",
            ProviderErrorKind::ApiKeyInvalid => "api_key_invalid",
            ProviderErrorKind::UnsupportedContent => "unsupported_content",
            ProviderErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a provider, always tagged with the provider name
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{provider} failed ({kind}): {message}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Timeout, message)
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ProviderErrorKind::Timeout
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Health snapshot of a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    pub last_check: Option<DateTime<Utc>>,
}

/// Contract implemented by every speech-synthesis backend.
///
/// Implementations must be safe to call concurrently from many requests.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Unique provider name, used in logs and result metadata
    fn name(&self) -> &str;

    /// Probe the backend.
    ///
    /// Implementations bound the probe with their own timeout and never
    /// propagate errors: any failure yields `false`.
    async fn is_available(&self) -> bool;

    /// Ordered list of voice identifiers the backend accepts
    async fn get_voices(&self) -> ProviderResult<Vec<String>>;

    /// Synthesize `text`.
    ///
    /// `cancel` is triggered when the caller stops waiting for this call.
    /// Implementations should abort in-flight transport work when it fires;
    /// the caller does not rely on it.
    async fn convert(
        &self,
        text: &str,
        settings: &AudioSettings,
        cancel: CancellationToken,
    ) -> ProviderResult<ConversionResult>;

    /// Current health snapshot
    fn get_status(&self) -> ProviderStatus;
}

/// Average words per minute at playback speed 1.0, used for text-based estimates
const WORDS_PER_MINUTE: f64 = 150.0;

/// Estimate audio duration in seconds.
///
/// Uses the byte length at the given constant bitrate when known, and falls
/// back to a speaking-rate estimate from the text otherwise. Never returns a
/// non-positive value for non-empty input.
pub fn estimate_duration(byte_len: usize, bitrate_kbps: Option<u32>, text: &str, speed: f32) -> f64 {
    if let Some(kbps) = bitrate_kbps
        && kbps > 0
        && byte_len > 0
    {
        return (byte_len as f64 * 8.0) / (kbps as f64 * 1000.0);
    }

    let words = text.split_whitespace().count().max(1) as f64;
    let speed = if speed.is_finite() && speed > 0.0 {
        speed as f64
    } else {
        1.0
    };
    (words / WORDS_PER_MINUTE) * 60.0 / speed
}
