use std::path::PathBuf;

use crate::{JobHandle, JobRecord, MiningParams, RunEpoch, StartResponse, StatusSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Ask the remote service for previously imported jobs.
    HistoryRequested,
    HistoryLoaded {
        selected_job_id: Option<String>,
        history: Vec<JobRecord>,
    },
    HistoryFailed(String),
    /// User asked for a specific job; resolved against history once it is loaded.
    JobChosen(String),
    /// Remote acknowledged (or refused) the active-job selection.
    JobSelectionAcked {
        job: JobHandle,
        error: Option<String>,
    },
    ParamsChanged(MiningParams),
    StartClicked,
    CancelClicked,
    /// Poll tick delivered a snapshot for the run tagged `epoch`.
    StatusPolled {
        epoch: RunEpoch,
        snapshot: StatusSnapshot,
    },
    StartResolved {
        epoch: RunEpoch,
        response: StartResponse,
    },
    StartFailed {
        epoch: RunEpoch,
        error: Option<String>,
    },
    ResultDownloaded {
        epoch: RunEpoch,
        result: Result<PathBuf, String>,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
