use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::reconcile::{RunOutcome, Transition};
use crate::{AppState, Effect, Msg, RunEpoch};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::HistoryRequested => vec![Effect::FetchHistory],
        Msg::HistoryLoaded {
            selected_job_id,
            history,
        } => {
            engine_info!("History loaded: {} jobs", history.len());
            state
                .set_history(selected_job_id, history)
                .map(|job| vec![Effect::SelectJob { job }])
                .unwrap_or_default()
        }
        Msg::HistoryFailed(error) => {
            engine_warn!("History unavailable: {}", error);
            state.set_history_error(error);
            Vec::new()
        }
        Msg::JobChosen(job_id) => state
            .request_job(job_id)
            .map(|job| vec![Effect::SelectJob { job }])
            .unwrap_or_default(),
        Msg::JobSelectionAcked { job, error } => {
            state.ack_selection(job, error);
            Vec::new()
        }
        Msg::ParamsChanged(params) => {
            state.set_params(params);
            Vec::new()
        }
        Msg::StartClicked => start_run(&mut state),
        Msg::CancelClicked => match state.cancel_run() {
            Some(epoch) => {
                engine_info!("Run {} cancelled", epoch);
                vec![Effect::StopPolling { epoch }]
            }
            None => Vec::new(),
        },
        Msg::StatusPolled { epoch, snapshot } => {
            let transition = state.apply_snapshot(epoch, &snapshot);
            finish_effects(epoch, transition)
        }
        Msg::StartResolved { epoch, response } => {
            let transition = state.apply_start_response(epoch, &response);
            finish_effects(epoch, transition)
        }
        Msg::StartFailed { epoch, error } => {
            let transition = state.apply_start_failure(epoch, error.as_deref());
            finish_effects(epoch, transition)
        }
        Msg::ResultDownloaded { epoch, result } => {
            state.record_download(epoch, result);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_run(state: &mut AppState) -> Vec<Effect> {
    let Some(job) = state.active_job().cloned() else {
        engine_debug!("Start ignored: no active job");
        return Vec::new();
    };
    if let Err(err) = state.params().validate() {
        engine_warn!("Start blocked by invalid parameter {}", err);
        state.set_validation_error(err);
        return Vec::new();
    }

    let mut effects = Vec::with_capacity(3);
    if let Some(previous) = state.cancel_run() {
        effects.push(Effect::StopPolling { epoch: previous });
    }
    let epoch = state.begin_run(job.clone());
    engine_info!("Run {} started for job {}", epoch, job);
    effects.push(Effect::StartMining {
        epoch,
        job: job.clone(),
        params: state.params().clone(),
    });
    effects.push(Effect::StartPolling { epoch, job });
    effects
}

fn finish_effects(epoch: RunEpoch, transition: Transition) -> Vec<Effect> {
    match transition {
        Transition::Ignored | Transition::Updated => Vec::new(),
        Transition::Finished(RunOutcome::Completed(result)) => {
            engine_info!("Run {} complete via {:?}", epoch, result.source);
            vec![
                Effect::StopPolling { epoch },
                Effect::ReportResult { epoch, result },
            ]
        }
        Transition::Finished(RunOutcome::Failed(message)) => {
            engine_warn!("Run {} failed: {}", epoch, message);
            vec![
                Effect::StopPolling { epoch },
                Effect::ReportFailure { epoch, message },
            ]
        }
        Transition::Finished(RunOutcome::Cancelled) => vec![Effect::StopPolling { epoch }],
    }
}
