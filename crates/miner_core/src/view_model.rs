use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::phase::DisplayedPhase;
use crate::{JobHandle, MiningParams, MiningResult, RunEpoch, ValidationError, WriterType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Why the start action is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartBlock {
    NoActiveJob,
    InvalidParams(ValidationError),
}

/// Where the remote active-job selection stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionView {
    #[default]
    None,
    Pending(JobHandle),
    Acked(JobHandle),
    Failed { job: JobHandle, error: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub session: SessionStatus,
    pub history_loaded: bool,
    pub history_error: Option<String>,
    pub active_job: Option<JobHandle>,
    pub selection: SelectionView,
    pub jobs: Vec<JobRowView>,
    pub params: MiningParams,
    pub epoch: Option<RunEpoch>,
    pub progress: f64,
    pub message: String,
    pub phase: Option<DisplayedPhase>,
    pub result_ready: bool,
    pub result: Option<MiningResult>,
    pub failure: Option<String>,
    pub download: Option<Result<PathBuf, String>>,
    pub validation_error: Option<ValidationError>,
    pub can_start: bool,
    pub start_block: Option<StartBlock>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobHandle,
    pub writer_type: WriterType,
    pub node_count: Option<u64>,
    pub edge_count: Option<u64>,
    pub imported_on: DateTime<Utc>,
    pub active: bool,
}
