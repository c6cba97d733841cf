use std::time::Duration;

use tracing::{info, warn};

use crate::core::tts::ProviderErrorKind;

/// Result of one provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(ProviderErrorKind),
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure(kind) => kind.as_str(),
        }
    }
}

/// Structured event emitted after every provider attempt
#[derive(Debug, Clone)]
pub struct AttemptEvent<'a> {
    pub conversion_id: &'a str,
    pub provider: &'a str,
    /// 1-based position in the candidate list
    pub attempt: usize,
    pub outcome: AttemptOutcome,
    pub latency: Duration,
}

/// Sink for per-attempt events.
///
/// The orchestrator only depends on this trait; deployments decide where the
/// events go.
pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, event: &AttemptEvent<'_>);

    /// Called once per conversion after availability probing
    fn on_probe(&self, _conversion_id: &str, _available: &[String], _unavailable: &[String]) {}
}

/// Default observer forwarding events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn on_attempt(&self, event: &AttemptEvent<'_>) {
        let latency_ms = event.latency.as_millis() as u64;
        match event.outcome {
            AttemptOutcome::Success => info!(
                conversion_id = event.conversion_id,
                provider = event.provider,
                attempt = event.attempt,
                outcome = event.outcome.as_str(),
                latency_ms,
                "TTS attempt succeeded"
            ),
            AttemptOutcome::Failure(_) => warn!(
                conversion_id = event.conversion_id,
                provider = event.provider,
                attempt = event.attempt,
                outcome = event.outcome.as_str(),
                latency_ms,
                "TTS attempt failed"
            ),
        }
    }

    fn on_probe(&self, conversion_id: &str, available: &[String], unavailable: &[String]) {
        info!(
            conversion_id,
            available = ?available,
            unavailable = ?unavailable,
            "Provider availability probed"
        );
    }
}
