use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, Utc};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::{ConversionError, ConversionFailure, OrchestratorError};
use super::observer::{AttemptEvent, AttemptObserver, AttemptOutcome, TracingObserver};
use super::status::{ConversionStatus, StatusTable};
use crate::core::storage::{AudioFileRecord, AudioMetadata, AudioStore};
use crate::core::tts::{
    AudioSettings, ConversionResult, PartialAudioSettings, ProviderDescriptor, ProviderError,
    ProviderErrorKind, ProviderRegistry, RegisteredProvider,
};

/// Maximum content length in characters
pub const MAX_CONTENT_LENGTH: usize = 2000;

/// Progress reported once probing has finished
const PROBED_PROGRESS: u8 = 10;
/// Progress span shared by the provider attempts
const ATTEMPT_PROGRESS_SPAN: usize = 80;

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound for each availability probe
    pub probe_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(3),
        }
    }
}

/// A successful conversion
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub id: String,
    pub result: Arc<ConversionResult>,
    pub record: AudioFileRecord,
}

/// Selects and sequences providers for each conversion and tracks its
/// lifecycle.
pub struct Orchestrator {
    registry: ProviderRegistry,
    store: Arc<AudioStore>,
    statuses: StatusTable,
    observer: Arc<dyn AttemptObserver>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(registry: ProviderRegistry, store: Arc<AudioStore>, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            store,
            statuses: StatusTable::new(),
            observer: Arc::new(TracingObserver),
            config,
        }
    }

    /// Replace the default tracing observer
    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<AudioStore> {
        &self.store
    }

    /// Convert `content` to speech and persist the audio.
    ///
    /// A status entry is registered before anything else so every outcome,
    /// including validation failures, is observable through [`Self::get_status`].
    pub async fn convert(
        &self,
        content: &str,
        settings: Option<PartialAudioSettings>,
    ) -> Result<ConversionOutcome, ConversionFailure> {
        let id = Uuid::new_v4().to_string();
        self.statuses.create(&id);

        match self.run(&id, content, settings).await {
            Ok(outcome) => Ok(outcome),
            Err(source) => {
                self.statuses.fail(&id, source.to_string());
                warn!("Conversion {} failed: {}", id, source);
                Err(ConversionFailure { id, source })
            }
        }
    }

    async fn run(
        &self,
        id: &str,
        content: &str,
        settings: Option<PartialAudioSettings>,
    ) -> Result<ConversionOutcome, ConversionError> {
        let (text, settings) = validate_request(content, settings)?;

        let candidates = self.available_candidates(id).await;
        self.statuses.mark_processing(id);
        self.statuses.advance(id, PROBED_PROGRESS);

        if candidates.is_empty() {
            return Err(ConversionError::ServiceUnavailable(
                "No TTS providers are available".to_string(),
            ));
        }

        let total = candidates.len();
        let mut last_error: Option<ProviderError> = None;

        for (index, entry) in candidates.into_iter().enumerate() {
            let name = entry.provider.name().to_string();
            let started = Instant::now();
            let attempt = self.attempt(&entry, text, &settings).await;

            self.observer.on_attempt(&AttemptEvent {
                conversion_id: id,
                provider: &name,
                attempt: index + 1,
                outcome: match &attempt {
                    Ok(_) => AttemptOutcome::Success,
                    Err(e) => AttemptOutcome::Failure(e.kind),
                },
                latency: started.elapsed(),
            });

            match attempt {
                Ok(result) => return self.finish(id, result).await,
                Err(e) => {
                    debug!("Conversion {} attempt {} on {} failed: {}", id, index + 1, name, e);
                    let progress = PROBED_PROGRESS as usize + ATTEMPT_PROGRESS_SPAN * (index + 1) / total;
                    self.statuses.advance(id, progress as u8);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => ConversionError::Provider(e),
            None => ConversionError::ServiceUnavailable("All TTS providers failed".to_string()),
        })
    }

    /// Probe every provider concurrently and keep the available ones in
    /// registry order.
    async fn available_candidates(&self, id: &str) -> Vec<RegisteredProvider> {
        let probe_timeout = self.config.probe_timeout;

        // Each probe runs in its own task so a panicking provider cannot take
        // down its siblings.
        let probes = self.registry.entries().iter().map(|entry| {
            let provider = Arc::clone(&entry.provider);
            tokio::spawn(async move {
                tokio::time::timeout(probe_timeout, provider.is_available())
                    .await
                    .unwrap_or(false)
            })
        });

        let results = join_all(probes).await;

        let mut available = Vec::new();
        let mut unavailable = Vec::new();
        let mut candidates = Vec::new();

        for (entry, probe) in self.registry.entries().iter().zip(results) {
            let name = entry.provider.name().to_string();
            match probe {
                Ok(true) => {
                    available.push(name);
                    candidates.push(entry.clone());
                }
                Ok(false) => unavailable.push(name),
                Err(e) => {
                    warn!("Availability probe for {} aborted: {}", name, e);
                    unavailable.push(name);
                }
            }
        }

        self.observer.on_probe(id, &available, &unavailable);
        candidates
    }

    /// Run one provider attempt under its deadline.
    async fn attempt(
        &self,
        entry: &RegisteredProvider,
        text: &str,
        settings: &AudioSettings,
    ) -> Result<ConversionResult, ProviderError> {
        let cancel = CancellationToken::new();
        let call = entry.provider.convert(text, settings, cancel.clone());

        let result = match tokio::time::timeout(entry.attempt_timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                // Best effort: providers honouring the token abort their request.
                cancel.cancel();
                return Err(ProviderError::timeout(
                    entry.provider.name(),
                    format!("No response within {}ms", entry.attempt_timeout.as_millis()),
                ));
            }
        };

        if result.audio_buffer.is_empty() || result.duration.is_nan() || result.duration <= 0.0 {
            return Err(ProviderError::new(
                entry.provider.name(),
                ProviderErrorKind::ServiceError,
                "Provider returned empty audio",
            ));
        }

        Ok(result)
    }

    async fn finish(&self, id: &str, result: ConversionResult) -> Result<ConversionOutcome, ConversionError> {
        let record = self
            .store
            .save(
                id,
                result.audio_buffer.clone(),
                AudioMetadata {
                    format: result.format,
                    duration: result.duration,
                },
            )
            .await?;

        let result = Arc::new(result);
        self.statuses.complete(id, Arc::clone(&result));

        info!(
            "Conversion {} completed by {} ({} bytes, {:.2}s)",
            id, result.metadata.tts_service, record.size, result.duration
        );

        Ok(ConversionOutcome {
            id: id.to_string(),
            result,
            record,
        })
    }

    pub fn get_status(&self, id: &str) -> Result<ConversionStatus, OrchestratorError> {
        self.statuses
            .get(id)
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    /// Result of a completed conversion
    pub fn get_result(&self, id: &str) -> Result<Arc<ConversionResult>, OrchestratorError> {
        self.statuses
            .result(id)
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    /// Prune status and result entries older than `max_age_minutes`
    pub fn cleanup(&self, max_age_minutes: u64) -> usize {
        let Some(cutoff) = i64::try_from(max_age_minutes)
            .ok()
            .and_then(ChronoDuration::try_minutes)
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            debug!("Status max age of {}m is out of range; nothing is old enough", max_age_minutes);
            return 0;
        };
        let removed = self.statuses.prune_older_than(cutoff);
        if removed > 0 {
            info!("Status cleanup removed {} conversion(s)", removed);
        }
        removed
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn provider_statuses(&self) -> Vec<ProviderDescriptor> {
        self.registry.descriptors()
    }

    /// Voice listings per provider. Providers whose listing fails are omitted.
    pub async fn voices(&self) -> BTreeMap<String, Vec<String>> {
        let listings = join_all(self.registry.entries().iter().map(|entry| async move {
            (entry.provider.name().to_string(), entry.provider.get_voices().await)
        }))
        .await;

        listings
            .into_iter()
            .filter_map(|(name, voices)| match voices {
                Ok(voices) => Some((name, voices)),
                Err(e) => {
                    warn!("Voice listing for {} failed: {}", name, e);
                    None
                }
            })
            .collect()
    }
}

/// Check content and settings before any provider is contacted.
///
/// Returns the trimmed text and the completed settings.
fn validate_request(
    content: &str,
    settings: Option<PartialAudioSettings>,
) -> Result<(&str, AudioSettings), ConversionError> {
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(ConversionError::Validation(format!(
            "Content exceeds maximum length of {MAX_CONTENT_LENGTH} characters"
        )));
    }

    let text = content.trim();
    if text.is_empty() {
        return Err(ConversionError::Validation(
            "Content must not be empty".to_string(),
        ));
    }

    let settings = AudioSettings::from_partial(settings);
    settings.validate().map_err(ConversionError::Validation)?;

    Ok((text, settings))
}
