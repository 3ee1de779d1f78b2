use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use miner_core::{JobHandle, RunEpoch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, MiningApi};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub cadence: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            cadence: Duration::from_millis(250),
        }
    }
}

/// Receives engine events (status ticks, call completions).
pub trait EventSink: Send + Sync {
    /// Delivers `event`. Returns `false` once the receiving side is gone.
    fn emit(&self, event: EngineEvent) -> bool;
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Polls job status for one run until cancelled or until the sink's
/// receiver is gone.
///
/// Failed ticks are logged and skipped. Ticks never overlap: a slow poll
/// delays the next one instead of stacking requests.
pub struct StatusPoller {
    epoch: RunEpoch,
    job: JobHandle,
    cadence: Duration,
    cancel: CancellationToken,
}

impl StatusPoller {
    pub fn new(epoch: RunEpoch, job: JobHandle, settings: &PollSettings) -> Self {
        Self {
            epoch,
            job,
            cadence: settings.cadence,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops this poller; a tick in flight when it fires is dropped.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(self, api: Arc<dyn MiningApi>, sink: Arc<dyn EventSink>) {
        let mut ticker = tokio::time::interval(self.cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut failed_ticks: u64 = 0;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => break,
                outcome = api.poll(&self.job) => outcome,
            };
            match outcome {
                Ok(snapshot) => {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    let delivered = sink.emit(EngineEvent::Status {
                        epoch: self.epoch,
                        snapshot,
                    });
                    if !delivered {
                        engine_debug!("Event receiver for run {} is gone", self.epoch);
                        break;
                    }
                }
                Err(err) => {
                    failed_ticks += 1;
                    engine_warn!(
                        "Status poll for run {} (job {}) failed, skipping tick ({} so far): {}",
                        self.epoch,
                        self.job,
                        failed_ticks,
                        err
                    );
                }
            }
        }
        engine_debug!(
            "Status poller for run {} stopped after {} failed ticks",
            self.epoch,
            failed_ticks
        );
    }
}
