use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::core::storage::{AudioStore, StorageError};
use crate::core::tts::{
    AudioFormat, AudioSettings, ConversionResult, PartialAudioSettings, ProviderError,
    ProviderErrorKind, ProviderRegistry, ProviderResult, ProviderStatus, RegisteredProvider,
    ResultMetadata, TtsProvider,
};

#[derive(Clone, Copy)]
enum Behavior {
    Succeed { bytes: usize, duration: f64 },
    Fail(ProviderErrorKind),
    Hang,
}

struct MockProvider {
    name: &'static str,
    available: bool,
    probe_delay: Option<Duration>,
    probe_panics: bool,
    behavior: Behavior,
    convert_calls: AtomicUsize,
    cancelled: Arc<AtomicUsize>,
}

impl MockProvider {
    fn new(name: &'static str, available: bool, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            available,
            probe_delay: None,
            probe_panics: false,
            behavior,
            convert_calls: AtomicUsize::new(0),
            cancelled: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn with_probe(
        name: &'static str,
        probe_delay: Option<Duration>,
        probe_panics: bool,
        behavior: Behavior,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            available: true,
            probe_delay,
            probe_panics,
            behavior,
            convert_calls: AtomicUsize::new(0),
            cancelled: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn calls(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn is_available(&self) -> bool {
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        if self.probe_panics {
            panic!("{} probe exploded", self.name);
        }
        self.available
    }

    async fn get_voices(&self) -> ProviderResult<Vec<String>> {
        if self.available {
            Ok(vec![format!("{}-voice", self.name)])
        } else {
            Err(ProviderError::new(self.name, ProviderErrorKind::ServiceError, "down"))
        }
    }

    async fn convert(
        &self,
        _text: &str,
        settings: &AudioSettings,
        cancel: CancellationToken,
    ) -> ProviderResult<ConversionResult> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed { bytes, duration } => Ok(ConversionResult {
                audio_buffer: Bytes::from(vec![1u8; bytes]),
                duration,
                format: AudioFormat::Mp3,
                metadata: ResultMetadata {
                    tts_service: self.name.to_string(),
                    voice: settings.voice.clone().unwrap_or_else(|| "default".into()),
                    timestamp: Utc::now(),
                },
            }),
            Behavior::Fail(kind) => Err(ProviderError::new(self.name, kind, "mock failure")),
            Behavior::Hang => {
                let cancelled = Arc::clone(&self.cancelled);
                let token = cancel.clone();
                tokio::spawn(async move {
                    token.cancelled().await;
                    cancelled.fetch_add(1, Ordering::SeqCst);
                });
                std::future::pending().await
            }
        }
    }

    fn get_status(&self) -> ProviderStatus {
        ProviderStatus {
            available: self.available,
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<(String, AttemptOutcome)>>,
    probes: Mutex<Vec<(Vec<String>, Vec<String>)>>,
}

impl AttemptObserver for RecordingObserver {
    fn on_attempt(&self, event: &AttemptEvent<'_>) {
        self.events
            .lock()
            .push((event.provider.to_string(), event.outcome));
    }

    fn on_probe(&self, _conversion_id: &str, available: &[String], unavailable: &[String]) {
        self.probes
            .lock()
            .push((available.to_vec(), unavailable.to_vec()));
    }
}

/// Captures the conversion state at the moment probing finishes
#[derive(Default)]
struct ProbeStateObserver {
    orchestrator: OnceLock<Weak<Orchestrator>>,
    states: Mutex<Vec<ConversionState>>,
}

impl AttemptObserver for ProbeStateObserver {
    fn on_attempt(&self, _event: &AttemptEvent<'_>) {}

    fn on_probe(&self, conversion_id: &str, _available: &[String], _unavailable: &[String]) {
        if let Some(orch) = self.orchestrator.get().and_then(Weak::upgrade)
            && let Ok(status) = orch.get_status(conversion_id)
        {
            self.states.lock().push(status.state);
        }
    }
}

fn entry(provider: Arc<MockProvider>, priority: f64, timeout_ms: u64) -> RegisteredProvider {
    RegisteredProvider {
        provider,
        priority,
        attempt_timeout: Duration::from_millis(timeout_ms),
    }
}

fn orchestrator(entries: Vec<RegisteredProvider>) -> Orchestrator {
    Orchestrator::new(
        ProviderRegistry::new(entries),
        Arc::new(AudioStore::in_memory(1024 * 1024)),
        OrchestratorConfig {
            probe_timeout: Duration::from_millis(200),
        },
    )
}

#[tokio::test]
async fn test_timeout_fails_over_to_next_provider() {
    let p1 = MockProvider::new("P1", true, Behavior::Hang);
    let p2 = MockProvider::new(
        "P2",
        true,
        Behavior::Succeed {
            bytes: 5000,
            duration: 2.5,
        },
    );
    let observer = Arc::new(RecordingObserver::default());
    let orch = orchestrator(vec![entry(p1.clone(), 1.0, 50), entry(p2.clone(), 2.0, 1000)])
        .with_observer(observer.clone());

    let outcome = orch.convert("Hello world", None).await.unwrap();

    assert_eq!(outcome.result.metadata.tts_service, "P2");
    assert_eq!(outcome.record.size, 5000);
    assert_eq!(outcome.result.duration, 2.5);

    let status = orch.get_status(&outcome.id).unwrap();
    assert_eq!(status.state, ConversionState::Completed);
    assert_eq!(status.progress, 100);

    assert_eq!(p1.calls(), 1);
    assert_eq!(p2.calls(), 1);

    let events = observer.events.lock().clone();
    assert_eq!(
        events,
        vec![
            ("P1".to_string(), AttemptOutcome::Failure(ProviderErrorKind::Timeout)),
            ("P2".to_string(), AttemptOutcome::Success),
        ]
    );

    // The abandoned call was signalled to stop.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(p1.cancelled.load(Ordering::SeqCst), 1);

    let stored = orch.store().get(&outcome.id).await.unwrap();
    assert_eq!(stored.len(), 5000);
}

#[tokio::test]
async fn test_no_available_providers_is_service_unavailable() {
    let p1 = MockProvider::new("P1", false, Behavior::Fail(ProviderErrorKind::Unknown));
    let p2 = MockProvider::new("P2", false, Behavior::Fail(ProviderErrorKind::Unknown));
    let orch = orchestrator(vec![entry(p1.clone(), 1.0, 100), entry(p2.clone(), 2.0, 100)]);

    let failure = orch.convert("Hello", None).await.unwrap_err();
    assert!(matches!(failure.source, ConversionError::ServiceUnavailable(_)));

    let status = orch.get_status(&failure.id).unwrap();
    assert_eq!(status.state, ConversionState::Failed);
    assert_eq!(status.progress, 0);
    assert!(status.error.is_some());

    assert_eq!(p1.calls(), 0);
    assert_eq!(p2.calls(), 0);
}

#[tokio::test]
async fn test_over_length_content_contacts_no_provider() {
    let p1 = MockProvider::new("P1", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = orchestrator(vec![entry(p1.clone(), 1.0, 100)]);

    let content = "a".repeat(2001);
    let failure = orch.convert(&content, None).await.unwrap_err();

    match &failure.source {
        ConversionError::Validation(message) => assert!(message.contains("exceeds maximum length")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(p1.calls(), 0);

    let status = orch.get_status(&failure.id).unwrap();
    assert_eq!(status.state, ConversionState::Failed);
}

#[tokio::test]
async fn test_blank_content_and_bad_settings_are_rejected() {
    let p1 = MockProvider::new("P1", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = orchestrator(vec![entry(p1.clone(), 1.0, 100)]);

    let failure = orch.convert("   \n\t ", None).await.unwrap_err();
    assert!(matches!(failure.source, ConversionError::Validation(_)));

    let settings = PartialAudioSettings {
        playback_speed: Some(3.0),
        ..Default::default()
    };
    let failure = orch.convert("Hello", Some(settings)).await.unwrap_err();
    assert!(matches!(failure.source, ConversionError::Validation(_)));

    assert_eq!(p1.calls(), 0);
}

#[tokio::test]
async fn test_exactly_max_length_is_accepted() {
    let p1 = MockProvider::new("P1", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = orchestrator(vec![entry(p1.clone(), 1.0, 100)]);

    let content = "é".repeat(MAX_CONTENT_LENGTH);
    assert!(orch.convert(&content, None).await.is_ok());
}

#[tokio::test]
async fn test_priority_order_stops_at_first_success() {
    let p_low = MockProvider::new("low", true, Behavior::Fail(ProviderErrorKind::ServiceError));
    let p_mid = MockProvider::new("mid", true, Behavior::Succeed { bytes: 100, duration: 1.0 });
    let p_high = MockProvider::new("high", true, Behavior::Succeed { bytes: 100, duration: 1.0 });
    let p_down = MockProvider::new("down", false, Behavior::Succeed { bytes: 100, duration: 1.0 });

    // Registered out of order; fractional priorities are only ordering keys.
    let orch = orchestrator(vec![
        entry(p_high.clone(), 3.0, 100),
        entry(p_mid.clone(), 1.5, 100),
        entry(p_down.clone(), 0.5, 100),
        entry(p_low.clone(), 1.0, 100),
    ]);

    let outcome = orch.convert("Priority test", None).await.unwrap();
    assert_eq!(outcome.result.metadata.tts_service, "mid");
    assert_eq!(p_down.calls(), 0);
    assert_eq!(p_low.calls(), 1);
    assert_eq!(p_mid.calls(), 1);
    assert_eq!(p_high.calls(), 0);
}

#[tokio::test]
async fn test_exhausted_candidates_surface_last_error() {
    let p1 = MockProvider::new("P1", true, Behavior::Fail(ProviderErrorKind::ServiceError));
    let p2 = MockProvider::new("P2", true, Behavior::Fail(ProviderErrorKind::ApiKeyInvalid));
    let orch = orchestrator(vec![entry(p1, 1.0, 100), entry(p2, 2.0, 100)]);

    let failure = orch.convert("Hello", None).await.unwrap_err();
    match failure.source {
        ConversionError::Provider(e) => {
            assert_eq!(e.provider, "P2");
            assert_eq!(e.kind, ProviderErrorKind::ApiKeyInvalid);
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    assert_eq!(orch.get_status(&failure.id).unwrap().progress, 0);
}

#[tokio::test]
async fn test_empty_audio_is_not_a_success() {
    let empty = MockProvider::new("empty", true, Behavior::Succeed { bytes: 0, duration: 1.0 });
    let silent = MockProvider::new("silent", true, Behavior::Succeed { bytes: 10, duration: 0.0 });
    let good = MockProvider::new("good", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = orchestrator(vec![
        entry(empty.clone(), 1.0, 100),
        entry(silent.clone(), 2.0, 100),
        entry(good.clone(), 3.0, 100),
    ]);

    let outcome = orch.convert("Hello", None).await.unwrap();
    assert_eq!(outcome.result.metadata.tts_service, "good");
    assert!(!outcome.result.audio_buffer.is_empty());
    assert!(outcome.result.duration > 0.0);
}

#[tokio::test]
async fn test_slow_probe_is_treated_as_unavailable() {
    let slow = MockProvider::with_probe(
        "slow",
        Some(Duration::from_secs(5)),
        false,
        Behavior::Succeed { bytes: 10, duration: 1.0 },
    );
    let fast = MockProvider::new("fast", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = orchestrator(vec![entry(slow.clone(), 1.0, 100), entry(fast.clone(), 2.0, 100)]);

    let started = std::time::Instant::now();
    let outcome = orch.convert("Hello", None).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(outcome.result.metadata.tts_service, "fast");
    assert_eq!(slow.calls(), 0);
}

#[tokio::test]
async fn test_settings_reach_provider() {
    let p1 = MockProvider::new("P1", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = orchestrator(vec![entry(p1, 1.0, 100)]);

    let settings = PartialAudioSettings {
        voice: Some("narrator".into()),
        ..Default::default()
    };
    let outcome = orch.convert("Hello", Some(settings)).await.unwrap();
    assert_eq!(outcome.result.metadata.voice, "narrator");
}

#[tokio::test]
async fn test_status_and_result_lookup() {
    let p1 = MockProvider::new("P1", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = orchestrator(vec![entry(p1, 1.0, 100)]);

    assert!(matches!(orch.get_status("nope"), Err(OrchestratorError::NotFound(_))));
    assert!(matches!(orch.get_result("nope"), Err(OrchestratorError::NotFound(_))));

    let outcome = orch.convert("Hello", None).await.unwrap();
    let result = orch.get_result(&outcome.id).unwrap();
    assert_eq!(result.audio_buffer.len(), 10);

    let failure = orch.convert("", None).await.unwrap_err();
    assert!(orch.get_status(&failure.id).is_ok());
    assert!(orch.get_result(&failure.id).is_err());
}

#[tokio::test]
async fn test_cleanup_is_idempotent() {
    let p1 = MockProvider::new("P1", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = orchestrator(vec![entry(p1, 1.0, 100)]);

    let outcome = orch.convert("Hello", None).await.unwrap();

    // Nothing is older than an hour.
    assert_eq!(orch.cleanup(60), 0);
    assert!(orch.get_status(&outcome.id).is_ok());

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(orch.cleanup(0), 1);
    assert_eq!(orch.cleanup(0), 0);
    assert!(orch.get_status(&outcome.id).is_err());
}

#[tokio::test]
async fn test_cleanup_with_huge_max_age_keeps_everything() {
    let p1 = MockProvider::new("P1", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = orchestrator(vec![entry(p1, 1.0, 100)]);

    let outcome = orch.convert("Hello", None).await.unwrap();

    assert_eq!(orch.cleanup(u64::MAX), 0);
    assert_eq!(orch.cleanup(200_000_000_000_000), 0);
    assert!(orch.get_status(&outcome.id).is_ok());
}

#[tokio::test]
async fn test_voices_skip_failing_providers() {
    let up = MockProvider::new("up", true, Behavior::Fail(ProviderErrorKind::Unknown));
    let down = MockProvider::new("down", false, Behavior::Fail(ProviderErrorKind::Unknown));
    let orch = orchestrator(vec![entry(up, 1.0, 100), entry(down, 2.0, 100)]);

    let voices = orch.voices().await;
    assert_eq!(voices.len(), 1);
    assert_eq!(voices["up"], vec!["up-voice"]);

    let descriptors = orch.provider_statuses();
    assert_eq!(orch.provider_names(), vec!["up", "down"]);
    assert!(descriptors[0].status.available);
    assert!(!descriptors[1].status.available);
}

#[tokio::test]
async fn test_concurrent_conversions_get_unique_ids() {
    let p1 = MockProvider::new("P1", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = Arc::new(orchestrator(vec![entry(p1.clone(), 1.0, 1000)]));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.convert(&format!("text {i}"), None).await })
        })
        .collect();

    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(ids.insert(outcome.id));
    }
    assert_eq!(p1.calls(), 16);
}

#[tokio::test]
async fn test_storage_failure_aborts_conversion() {
    let big = MockProvider::new("big", true, Behavior::Succeed { bytes: 2048, duration: 1.0 });
    let spare = MockProvider::new("spare", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let orch = Orchestrator::new(
        ProviderRegistry::new(vec![entry(big.clone(), 1.0, 100), entry(spare.clone(), 2.0, 100)]),
        Arc::new(AudioStore::in_memory(1024)),
        OrchestratorConfig::default(),
    );

    let failure = orch.convert("Hello", None).await.unwrap_err();
    assert!(matches!(
        failure.source,
        ConversionError::Storage(StorageError::PayloadTooLarge { size: 2048, limit: 1024 })
    ));

    let status = orch.get_status(&failure.id).unwrap();
    assert_eq!(status.state, ConversionState::Failed);
    assert!(status.error.is_some());
    assert!(matches!(orch.get_result(&failure.id), Err(OrchestratorError::NotFound(_))));
    assert!(!orch.store().exists(&failure.id).await.unwrap());

    // A storage failure is not a provider failure; no failover happens.
    assert_eq!(big.calls(), 1);
    assert_eq!(spare.calls(), 0);
}

#[tokio::test]
async fn test_panicking_probe_is_isolated() {
    let broken = MockProvider::with_probe(
        "broken",
        None,
        true,
        Behavior::Succeed { bytes: 10, duration: 1.0 },
    );
    let healthy = MockProvider::new("healthy", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let observer = Arc::new(RecordingObserver::default());
    let orch = orchestrator(vec![entry(broken.clone(), 1.0, 100), entry(healthy.clone(), 2.0, 100)])
        .with_observer(observer.clone());

    let outcome = orch.convert("Hello", None).await.unwrap();
    assert_eq!(outcome.result.metadata.tts_service, "healthy");
    assert_eq!(broken.calls(), 0);

    let probes = observer.probes.lock().clone();
    assert_eq!(
        probes,
        vec![(vec!["healthy".to_string()], vec!["broken".to_string()])]
    );
}

#[tokio::test]
async fn test_probes_run_concurrently() {
    let delay = Duration::from_millis(150);
    let providers: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|name| {
            MockProvider::with_probe(
                name,
                Some(delay),
                false,
                Behavior::Succeed { bytes: 10, duration: 1.0 },
            )
        })
        .collect();
    let observer = Arc::new(RecordingObserver::default());
    let orch = orchestrator(
        providers
            .iter()
            .enumerate()
            .map(|(i, p)| entry(p.clone(), i as f64, 1000))
            .collect(),
    )
    .with_observer(observer.clone());

    let started = std::time::Instant::now();
    orch.convert("Hello", None).await.unwrap();
    let elapsed = started.elapsed();

    // Sequential probing would take four delays.
    assert!(elapsed >= delay);
    assert!(elapsed < delay * 3, "probing took {elapsed:?}");
    assert_eq!(observer.probes.lock()[0].0.len(), 4);
}

#[tokio::test]
async fn test_status_is_pending_while_probing() {
    let p1 = MockProvider::new("P1", true, Behavior::Succeed { bytes: 10, duration: 1.0 });
    let observer = Arc::new(ProbeStateObserver::default());
    let orch = Arc::new(orchestrator(vec![entry(p1, 1.0, 100)]).with_observer(observer.clone()));
    let _ = observer.orchestrator.set(Arc::downgrade(&orch));

    let outcome = orch.convert("Hello", None).await.unwrap();

    assert_eq!(*observer.states.lock(), vec![ConversionState::Pending]);
    assert_eq!(orch.get_status(&outcome.id).unwrap().state, ConversionState::Completed);
}
