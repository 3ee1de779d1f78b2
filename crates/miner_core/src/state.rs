use std::path::PathBuf;

use engine_logging::engine_debug;

use crate::phase::ReconcilerConfig;
use crate::reconcile::{ProgressReconciler, RunOutcome, RunStatus, Transition};
use crate::select::select_active_job;
use crate::view_model::{AppViewModel, JobRowView, SelectionView, SessionStatus, StartBlock};
use crate::{
    JobHandle, JobRecord, MiningParams, RunEpoch, StartResponse, StatusSnapshot, ValidationError,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    history: Option<Vec<JobRecord>>,
    history_error: Option<String>,
    requested_job: Option<String>,
    remote_selected: Option<String>,
    active_job: Option<JobHandle>,
    selection: SelectionView,
    params: MiningParams,
    validation_error: Option<ValidationError>,
    config: ReconcilerConfig,
    last_epoch: RunEpoch,
    run: Option<ProgressReconciler>,
    download: Option<Result<PathBuf, String>>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReconcilerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        let session = match self.run.as_ref().map(ProgressReconciler::status) {
            None => SessionStatus::Idle,
            Some(RunStatus::Running) => SessionStatus::Running,
            Some(RunStatus::Completed) => SessionStatus::Completed,
            Some(RunStatus::Failed) => SessionStatus::Failed,
            Some(RunStatus::Cancelled) => SessionStatus::Cancelled,
        };
        let reconciled = self.run.as_ref().map(|run| run.state().clone());
        let (result, failure) = match self.run.as_ref().and_then(ProgressReconciler::outcome) {
            Some(RunOutcome::Completed(result)) => (Some(result.clone()), None),
            Some(RunOutcome::Failed(message)) => (None, Some(message.clone())),
            Some(RunOutcome::Cancelled) | None => (None, None),
        };
        let start_block = self.start_block();

        AppViewModel {
            session,
            history_loaded: self.history.is_some(),
            history_error: self.history_error.clone(),
            active_job: self.active_job.clone(),
            selection: self.selection.clone(),
            jobs: self
                .history()
                .iter()
                .map(|record| JobRowView {
                    job_id: record.job_id.clone(),
                    writer_type: record.writer_type,
                    node_count: record.node_count,
                    edge_count: record.edge_count,
                    imported_on: record.imported_on,
                    active: self.active_job.as_ref() == Some(&record.job_id),
                })
                .collect(),
            params: self.params.clone(),
            epoch: self.run.as_ref().map(ProgressReconciler::epoch),
            progress: reconciled
                .as_ref()
                .map_or(0.0, |state| state.displayed_progress),
            message: reconciled
                .as_ref()
                .map(|state| state.displayed_message.clone())
                .unwrap_or_default(),
            phase: reconciled.as_ref().and_then(|state| state.displayed_phase),
            result_ready: reconciled.as_ref().is_some_and(|state| state.result_ready),
            result,
            failure,
            download: self.download.clone(),
            validation_error: self.validation_error.clone(),
            can_start: start_block.is_none(),
            start_block,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn history(&self) -> &[JobRecord] {
        self.history.as_deref().unwrap_or_default()
    }

    pub fn active_job(&self) -> Option<&JobHandle> {
        self.active_job.as_ref()
    }

    pub fn params(&self) -> &MiningParams {
        &self.params
    }

    pub fn run(&self) -> Option<&ProgressReconciler> {
        self.run.as_ref()
    }

    pub(crate) fn start_block(&self) -> Option<StartBlock> {
        if self.active_job.is_none() {
            return Some(StartBlock::NoActiveJob);
        }
        self.params
            .validate()
            .err()
            .map(StartBlock::InvalidParams)
    }

    /// Stores the history and resolves the active job. Returns the job when the
    /// remote service needs to be told about a new selection.
    pub(crate) fn set_history(
        &mut self,
        selected_job_id: Option<String>,
        history: Vec<JobRecord>,
    ) -> Option<JobHandle> {
        self.history = Some(history);
        self.history_error = None;
        self.remote_selected = selected_job_id;
        self.mark_dirty();
        self.resolve_active_job()
    }

    pub(crate) fn set_history_error(&mut self, error: String) {
        self.history_error = Some(error);
        self.mark_dirty();
    }

    pub(crate) fn request_job(&mut self, job_id: String) -> Option<JobHandle> {
        self.requested_job = Some(job_id);
        if self.history.is_none() {
            return None;
        }
        self.resolve_active_job()
    }

    fn resolve_active_job(&mut self) -> Option<JobHandle> {
        let requested = self
            .requested_job
            .as_deref()
            .or(self.remote_selected.as_deref());
        let resolved = select_active_job(self.history(), requested);
        if resolved != self.active_job {
            engine_debug!(
                "Active job {:?} -> {:?} (requested {:?})",
                self.active_job,
                resolved,
                requested
            );
            self.active_job = resolved.clone();
            self.mark_dirty();
        }
        let job = resolved?;
        if self.remote_selected.as_deref() == Some(job.as_str()) {
            self.selection = SelectionView::Acked(job);
            return None;
        }
        self.selection = SelectionView::Pending(job.clone());
        Some(job)
    }

    pub(crate) fn ack_selection(&mut self, job: JobHandle, error: Option<String>) {
        if self.active_job.as_ref() != Some(&job) {
            return;
        }
        self.selection = match error {
            None => {
                self.remote_selected = Some(job.as_str().to_string());
                SelectionView::Acked(job)
            }
            Some(error) => SelectionView::Failed { job, error },
        };
        self.mark_dirty();
    }

    pub(crate) fn set_params(&mut self, params: MiningParams) {
        self.params = params;
        self.validation_error = None;
        self.mark_dirty();
    }

    pub(crate) fn set_validation_error(&mut self, error: ValidationError) {
        self.validation_error = Some(error);
        self.mark_dirty();
    }

    /// Opens a new run epoch for `job`, replacing any previous run.
    pub(crate) fn begin_run(&mut self, job: JobHandle) -> RunEpoch {
        self.last_epoch += 1;
        let epoch = self.last_epoch;
        self.run = Some(ProgressReconciler::start(epoch, job, self.config));
        self.validation_error = None;
        self.download = None;
        self.mark_dirty();
        epoch
    }

    /// Cancels the current run if it is still going. Returns its epoch.
    pub(crate) fn cancel_run(&mut self) -> Option<RunEpoch> {
        let run = self.run.as_mut()?;
        let epoch = run.epoch();
        match run.cancel() {
            Transition::Finished(_) => {
                self.mark_dirty();
                Some(epoch)
            }
            Transition::Ignored | Transition::Updated => None,
        }
    }

    pub(crate) fn apply_snapshot(&mut self, epoch: RunEpoch, snapshot: &StatusSnapshot) -> Transition {
        self.apply_to_run(|run| run.apply_snapshot(epoch, snapshot))
    }

    pub(crate) fn apply_start_response(
        &mut self,
        epoch: RunEpoch,
        response: &StartResponse,
    ) -> Transition {
        self.apply_to_run(|run| run.apply_start_response(epoch, response))
    }

    pub(crate) fn apply_start_failure(&mut self, epoch: RunEpoch, error: Option<&str>) -> Transition {
        self.apply_to_run(|run| run.apply_start_failure(epoch, error))
    }

    pub(crate) fn record_download(&mut self, epoch: RunEpoch, result: Result<PathBuf, String>) {
        if self.run.as_ref().map(ProgressReconciler::epoch) != Some(epoch) {
            engine_debug!("Ignoring download result for superseded run {}", epoch);
            return;
        }
        self.download = Some(result);
        self.mark_dirty();
    }

    fn apply_to_run(&mut self, apply: impl FnOnce(&mut ProgressReconciler) -> Transition) -> Transition {
        let transition = match self.run.as_mut() {
            Some(run) => apply(run),
            None => Transition::Ignored,
        };
        if transition != Transition::Ignored {
            self.mark_dirty();
        }
        transition
    }
}
