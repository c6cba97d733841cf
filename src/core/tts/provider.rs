use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::base::{
    AudioFormat, AudioSettings, ConversionResult, ProviderError, ProviderErrorKind,
    ProviderResult, ProviderStatus, ResultMetadata, TtsProvider, estimate_duration,
};
use crate::utils::req_manager::ReqManager;

/// Generic voice identifiers every provider translates
pub const GENERIC_VOICES: [&str; 4] = ["default", "female", "male", "narrator"];

/// Translate a generic voice identifier through a provider table.
///
/// Unknown identifiers are passed through verbatim so clients can still
/// address provider-native voices directly.
pub fn translate_voice(table: &[(&str, &str)], requested: Option<&str>) -> String {
    let key = requested
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("default");

    table
        .iter()
        .find(|(generic, _)| generic.eq_ignore_ascii_case(key))
        .map(|(_, native)| (*native).to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Map an HTTP status returned by a backend to an error kind
pub fn classify_status(status: StatusCode) -> ProviderErrorKind {
    match status.as_u16() {
        401 | 403 => ProviderErrorKind::ApiKeyInvalid,
        400 | 413 | 415 | 422 => ProviderErrorKind::UnsupportedContent,
        408 | 504 => ProviderErrorKind::Timeout,
        429 => ProviderErrorKind::ServiceError,
        s if (500..600).contains(&s) => ProviderErrorKind::ServiceError,
        _ => ProviderErrorKind::Unknown,
    }
}

/// Map a transport failure to an error kind
pub fn classify_transport(err: &reqwest::Error) -> ProviderErrorKind {
    if err.is_timeout() {
        ProviderErrorKind::Timeout
    } else if err.is_connect() || err.is_request() {
        ProviderErrorKind::ServiceError
    } else {
        ProviderErrorKind::Unknown
    }
}

/// Trait for building the backend-specific HTTP requests.
///
/// This is the only part a new HTTP backend needs to implement; transport,
/// health tracking and error classification are shared.
pub trait SynthesisRequestBuilder: Send + Sync {
    /// Name reported in results and errors
    fn provider_name(&self) -> &str;

    /// Build the synthesis request for already-translated `voice`
    fn build_synthesis_request(
        &self,
        client: &reqwest::Client,
        text: &str,
        voice: &str,
        settings: &AudioSettings,
    ) -> reqwest::RequestBuilder;

    /// Build a lightweight authenticated request listing voices.
    ///
    /// Also used as the availability probe.
    fn build_voices_request(&self, client: &reqwest::Client) -> reqwest::RequestBuilder;

    /// Extract voice identifiers from the voices response body
    fn parse_voices(&self, body: &serde_json::Value) -> Vec<String>;

    /// Generic-to-native voice translation table
    fn voice_table(&self) -> &'static [(&'static str, &'static str)];

    /// Container returned by the synthesis endpoint
    fn output_format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    /// Constant bitrate of the requested output, when known
    fn bitrate_kbps(&self) -> Option<u32>;

    fn resolve_voice(&self, requested: Option<&str>) -> String {
        translate_voice(self.voice_table(), requested)
    }
}

/// Rolling health counters for one provider
#[derive(Debug, Default)]
pub struct ProviderHealth {
    available: AtomicBool,
    attempts: AtomicU64,
    failures: AtomicU64,
    total_latency_ms: AtomicU64,
    last_check: RwLock<Option<DateTime<Utc>>>,
}

impl ProviderHealth {
    pub fn record_probe(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
        *self.last_check.write() = Some(Utc::now());
    }

    pub fn record_attempt(&self, success: bool, elapsed: Duration) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
        if !success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ProviderStatus {
        let attempts = self.attempts.load(Ordering::Relaxed);
        let (response_time_ms, error_rate) = if attempts > 0 {
            let failures = self.failures.load(Ordering::Relaxed);
            (
                Some(self.total_latency_ms.load(Ordering::Relaxed) / attempts),
                Some(failures as f64 / attempts as f64),
            )
        } else {
            (None, None)
        };

        ProviderStatus {
            available: self.available.load(Ordering::Relaxed),
            response_time_ms,
            error_rate,
            last_check: *self.last_check.read(),
        }
    }
}

/// Records one attempt in [`ProviderHealth`].
///
/// An attempt whose future is dropped before finishing (the caller's deadline
/// expired) is recorded as a failure.
struct AttemptRecorder<'a> {
    health: &'a ProviderHealth,
    started: Instant,
    recorded: bool,
}

impl<'a> AttemptRecorder<'a> {
    fn start(health: &'a ProviderHealth) -> Self {
        Self {
            health,
            started: Instant::now(),
            recorded: false,
        }
    }

    fn finish(&mut self, success: bool) {
        self.health.record_attempt(success, self.started.elapsed());
        self.recorded = true;
    }
}

impl Drop for AttemptRecorder<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.health.record_attempt(false, self.started.elapsed());
        }
    }
}

/// HTTP-backed provider driving a [`SynthesisRequestBuilder`]
pub struct HttpSynthesizer<B: SynthesisRequestBuilder> {
    builder: B,
    req_manager: Arc<ReqManager>,
    probe_timeout: Duration,
    health: ProviderHealth,
}

impl<B: SynthesisRequestBuilder> HttpSynthesizer<B> {
    pub fn new(builder: B, req_manager: Arc<ReqManager>, probe_timeout: Duration) -> Self {
        Self {
            builder,
            req_manager,
            probe_timeout,
            health: ProviderHealth::default(),
        }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    fn error(&self, kind: ProviderErrorKind, message: impl Into<String>) -> ProviderError {
        ProviderError::new(self.builder.provider_name(), kind, message)
    }

    async fn synthesize(&self, text: &str, settings: &AudioSettings) -> ProviderResult<ConversionResult> {
        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| self.error(ProviderErrorKind::Unknown, format!("Failed to acquire client: {e}")))?;

        let voice = self.builder.resolve_voice(settings.voice.as_deref());
        let request = self
            .builder
            .build_synthesis_request(guard.client(), text, &voice, settings);

        let response = request
            .send()
            .await
            .map_err(|e| self.error(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(self.error(classify_status(status), format!("API error ({status}): {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| self.error(classify_transport(&e), format!("Failed to read audio body: {e}")))?;

        if audio.is_empty() {
            return Err(self.error(ProviderErrorKind::ServiceError, "Provider returned empty audio"));
        }

        let duration = estimate_duration(
            audio.len(),
            self.builder.bitrate_kbps(),
            text,
            settings.playback_speed,
        );

        debug!(
            "{} synthesized {} bytes ({:.2}s) with voice {}",
            self.builder.provider_name(),
            audio.len(),
            duration,
            voice
        );

        Ok(ConversionResult {
            audio_buffer: audio,
            duration,
            format: self.builder.output_format(),
            metadata: ResultMetadata {
                tts_service: self.builder.provider_name().to_string(),
                voice,
                timestamp: Utc::now(),
            },
        })
    }
}

#[async_trait]
impl<B: SynthesisRequestBuilder> TtsProvider for HttpSynthesizer<B> {
    fn name(&self) -> &str {
        self.builder.provider_name()
    }

    async fn is_available(&self) -> bool {
        let probe = async {
            let guard = self
                .req_manager
                .acquire()
                .await
                .map_err(|e| format!("could not acquire client: {e}"))?;
            let response = self
                .builder
                .build_voices_request(guard.client())
                .send()
                .await
                .map_err(|e| e.to_string())?;
            Ok::<bool, String>(response.status().is_success())
        };

        let available = match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(available)) => available,
            Ok(Err(e)) => {
                debug!("{} probe failed: {}", self.name(), e);
                false
            }
            Err(_) => {
                debug!("{} probe timed out after {:?}", self.name(), self.probe_timeout);
                false
            }
        };

        if !available {
            warn!("{} reported unavailable", self.name());
        }
        self.health.record_probe(available);
        available
    }

    async fn get_voices(&self) -> ProviderResult<Vec<String>> {
        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| self.error(ProviderErrorKind::Unknown, e.to_string()))?;

        let response = self
            .builder
            .build_voices_request(guard.client())
            .send()
            .await
            .map_err(|e| self.error(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.error(classify_status(status), format!("Voice listing failed ({status})")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.error(ProviderErrorKind::ServiceError, format!("Invalid voices payload: {e}")))?;

        Ok(self.builder.parse_voices(&body))
    }

    async fn convert(
        &self,
        text: &str,
        settings: &AudioSettings,
        cancel: CancellationToken,
    ) -> ProviderResult<ConversionResult> {
        let mut recorder = AttemptRecorder::start(&self.health);

        // Dropping the request future aborts the underlying connection.
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(self.error(ProviderErrorKind::Timeout, "Cancelled by caller")),
            result = self.synthesize(text, settings) => result,
        };

        recorder.finish(outcome.is_ok());
        outcome
    }

    fn get_status(&self) -> ProviderStatus {
        self.health.snapshot()
    }
}
