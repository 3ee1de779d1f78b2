//! Progress reconciliation for a single mining run.
//!
//! A run is fed two independent signals: status snapshots from the poller and
//! the eventual reply to the start call. Either may complete the run. The
//! outcome lives in a [`FinalizeCell`] that accepts exactly one write for the
//! run's epoch, so whichever signal lands first wins and everything after it
//! is a no-op.

use engine_logging::engine_debug;

use crate::phase::{classify_phase, DisplayedPhase, PhaseMemory, ReconcilerConfig};
use crate::{
    DownloadDescriptor, JobHandle, MiningResult, ResultSource, RunEpoch, StartResponse,
    StatusKind, StatusSnapshot,
};

/// Shown when the start call fails without a usable message.
pub const START_FAILURE_FALLBACK: &str = "Mining job could not be started";

const INITIAL_MESSAGE: &str = "Starting mining job";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconciledState {
    /// Non-decreasing within a run.
    pub displayed_progress: f64,
    pub displayed_message: String,
    pub displayed_phase: Option<DisplayedPhase>,
    pub terminal: bool,
    pub result_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(MiningResult),
    Failed(String),
    Cancelled,
}

/// Single-assignment slot for a run's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeCell {
    epoch: RunEpoch,
    outcome: Option<RunOutcome>,
}

impl FinalizeCell {
    pub fn new(epoch: RunEpoch) -> Self {
        Self {
            epoch,
            outcome: None,
        }
    }

    /// Stores `outcome` if this is the first settle for the cell's epoch.
    /// Returns whether the write landed.
    pub fn settle(&mut self, epoch: RunEpoch, outcome: RunOutcome) -> bool {
        if epoch != self.epoch || self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(outcome);
        true
    }

    pub fn get(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Result of feeding one event into the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Stale epoch or run already finished; nothing changed.
    Ignored,
    Updated,
    /// This event finished the run.
    Finished(RunOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReconciler {
    epoch: RunEpoch,
    job: JobHandle,
    config: ReconcilerConfig,
    state: ReconciledState,
    phases: PhaseMemory,
    outcome: FinalizeCell,
}

impl ProgressReconciler {
    pub fn start(epoch: RunEpoch, job: JobHandle, config: ReconcilerConfig) -> Self {
        Self {
            epoch,
            job,
            config,
            state: ReconciledState {
                displayed_message: INITIAL_MESSAGE.to_string(),
                ..ReconciledState::default()
            },
            phases: PhaseMemory::default(),
            outcome: FinalizeCell::new(epoch),
        }
    }

    pub fn epoch(&self) -> RunEpoch {
        self.epoch
    }

    pub fn job(&self) -> &JobHandle {
        &self.job
    }

    pub fn state(&self) -> &ReconciledState {
        &self.state
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.get()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_settled()
    }

    pub fn status(&self) -> RunStatus {
        match self.outcome.get() {
            None => RunStatus::Running,
            Some(RunOutcome::Completed(_)) => RunStatus::Completed,
            Some(RunOutcome::Failed(_)) => RunStatus::Failed,
            Some(RunOutcome::Cancelled) => RunStatus::Cancelled,
        }
    }

    pub fn apply_snapshot(&mut self, epoch: RunEpoch, snapshot: &StatusSnapshot) -> Transition {
        if !self.accepts(epoch) {
            engine_debug!(
                "Ignoring status for run {} (current run {}, finished: {})",
                epoch,
                self.epoch,
                self.is_finished()
            );
            return Transition::Ignored;
        }

        let previous_max = self.state.displayed_progress;
        let progress = clamp_progress(snapshot.progress);
        self.state.displayed_progress = previous_max.max(progress);

        // Out-of-order ticks may carry older text; only near-current snapshots speak.
        if progress >= previous_max - self.config.message_tolerance {
            if let Some(message) = snapshot
                .message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
            {
                self.state.displayed_message = message.to_string();
            }
            let label = classify_phase(
                self.state.displayed_progress,
                &snapshot.phases,
                &self.config,
            );
            self.state.displayed_phase = match label {
                Some(label) => label
                    .counter(&snapshot.phases)
                    .map(|counter| self.phases.display(label, counter)),
                None => None,
            };
        }

        if snapshot.status == StatusKind::Completed || progress >= 100.0 {
            let result = MiningResult {
                job: self.job.clone(),
                download: DownloadDescriptor::resolve(snapshot.download_url.as_deref(), &self.job),
                patterns_count: snapshot.patterns_count,
                source: ResultSource::Poll,
            };
            return self.finish(RunOutcome::Completed(result));
        }
        Transition::Updated
    }

    pub fn apply_start_response(&mut self, epoch: RunEpoch, response: &StartResponse) -> Transition {
        if !self.accepts(epoch) {
            engine_debug!("Ignoring start response for run {}", epoch);
            return Transition::Ignored;
        }
        let result = MiningResult {
            job: self.job.clone(),
            download: DownloadDescriptor::resolve(response.download_url.as_deref(), &self.job),
            patterns_count: response.patterns_count,
            source: ResultSource::StartResponse,
        };
        self.finish(RunOutcome::Completed(result))
    }

    pub fn apply_start_failure(&mut self, epoch: RunEpoch, error: Option<&str>) -> Transition {
        if !self.accepts(epoch) {
            engine_debug!("Ignoring start failure for run {}", epoch);
            return Transition::Ignored;
        }
        let message = error
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(START_FAILURE_FALLBACK);
        self.finish(RunOutcome::Failed(message.to_string()))
    }

    pub fn cancel(&mut self) -> Transition {
        self.finish(RunOutcome::Cancelled)
    }

    fn accepts(&self, epoch: RunEpoch) -> bool {
        epoch == self.epoch && !self.outcome.is_settled()
    }

    fn finish(&mut self, outcome: RunOutcome) -> Transition {
        if !self.outcome.settle(self.epoch, outcome.clone()) {
            return Transition::Ignored;
        }
        if let RunOutcome::Completed(_) = outcome {
            self.state.displayed_progress = 100.0;
            self.state.terminal = true;
            self.state.result_ready = true;
        }
        Transition::Finished(outcome)
    }
}

/// Clamps raw progress into `[0, 100]`; NaN counts as no progress.
pub fn clamp_progress(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_cell_takes_only_the_first_write() {
        let mut cell = FinalizeCell::new(4);
        assert!(!cell.settle(3, RunOutcome::Cancelled));
        assert!(cell.settle(4, RunOutcome::Failed("boom".into())));
        assert!(!cell.settle(4, RunOutcome::Cancelled));
        assert_eq!(cell.get(), Some(&RunOutcome::Failed("boom".into())));
    }

    #[test]
    fn clamp_handles_out_of_range_and_nan() {
        assert_eq!(clamp_progress(-3.0), 0.0);
        assert_eq!(clamp_progress(140.0), 100.0);
        assert_eq!(clamp_progress(f64::NAN), 0.0);
        assert_eq!(clamp_progress(42.5), 42.5);
    }
}
