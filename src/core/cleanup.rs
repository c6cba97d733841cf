//! Periodic sweep of conversion statuses and stored audio.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::orchestrator::Orchestrator;

/// Retention settings for the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSchedule {
    pub interval: Duration,
    pub status_max_age_minutes: u64,
    pub audio_max_age_hours: u64,
}

/// Run one sweep. Failures are logged, never propagated.
pub async fn run_cleanup_pass(orchestrator: &Orchestrator, schedule: &CleanupSchedule) {
    let statuses = orchestrator.cleanup(schedule.status_max_age_minutes);

    match orchestrator.store().cleanup(schedule.audio_max_age_hours).await {
        Ok(files) => debug!(
            "Cleanup pass finished: {} status entries, {} audio files",
            statuses, files
        ),
        Err(e) => warn!("Audio cleanup failed: {}", e),
    }
}

/// Spawn the background sweep. Returns `None` when the interval is zero.
///
/// The first tick fires immediately; missed ticks are skipped rather than
/// replayed in a burst.
pub fn spawn_cleanup_task(
    orchestrator: Arc<Orchestrator>,
    schedule: CleanupSchedule,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    if schedule.interval.is_zero() {
        info!("Background cleanup disabled");
        return None;
    }

    info!(
        "Starting background cleanup every {:?} (status {} min, audio {} h)",
        schedule.interval, schedule.status_max_age_minutes, schedule.audio_max_age_hours
    );

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(schedule.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Background cleanup stopped");
                    break;
                }
                _ = interval.tick() => run_cleanup_pass(&orchestrator, &schedule).await,
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::orchestrator::OrchestratorConfig;
    use crate::core::storage::{AudioMetadata, AudioStore};
    use crate::core::tts::{AudioFormat, ProviderRegistry};
    use bytes::Bytes;

    fn orchestrator() -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(
            ProviderRegistry::default(),
            Arc::new(AudioStore::in_memory(1024)),
            OrchestratorConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_disabled_when_interval_is_zero() {
        let schedule = CleanupSchedule {
            interval: Duration::ZERO,
            status_max_age_minutes: 60,
            audio_max_age_hours: 24,
        };
        assert!(spawn_cleanup_task(orchestrator(), schedule, CancellationToken::new()).is_none());
    }

    #[tokio::test]
    async fn test_task_sweeps_and_stops_on_shutdown() {
        let orch = orchestrator();
        orch.store()
            .save(
                "stale",
                Bytes::from_static(b"abc"),
                AudioMetadata {
                    format: AudioFormat::Mp3,
                    duration: 1.0,
                },
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let schedule = CleanupSchedule {
            interval: Duration::from_millis(10),
            status_max_age_minutes: 0,
            audio_max_age_hours: 0,
        };
        let shutdown = CancellationToken::new();
        let handle = spawn_cleanup_task(Arc::clone(&orch), schedule, shutdown.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!orch.store().exists("stale").await.unwrap());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
