//! Miner core: pure run state machine, phase inference and job selection.
mod effect;
mod msg;
mod params;
mod phase;
mod reconcile;
mod select;
mod state;
mod types;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use params::{
    GraphType, MiningParams, OutputFormat, ParamField, SamplingMethod, SearchStrategy,
    ValidationError,
};
pub use phase::{
    classify_phase, DisplayedPhase, PhaseLabel, PhaseMemory, ReconcilerConfig,
    MESSAGE_TOLERANCE, SAVING_BAND_START, SEARCH_BAND_START,
};
pub use reconcile::{
    clamp_progress, FinalizeCell, ProgressReconciler, ReconciledState, RunOutcome, RunStatus,
    Transition, START_FAILURE_FALLBACK,
};
pub use select::{select_active_job, SIBLING_WINDOW_SECS};
pub use state::AppState;
pub use types::{
    DownloadDescriptor, JobHandle, JobRecord, MiningResult, PhaseCounter, PhaseCounters,
    ResultSource, RunEpoch, StartResponse, StatusKind, StatusSnapshot, WriterType,
};
pub use update::update;
pub use view_model::{AppViewModel, JobRowView, SelectionView, SessionStatus, StartBlock};
