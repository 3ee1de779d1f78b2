use crate::{JobHandle, MiningParams, MiningResult, RunEpoch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchHistory,
    /// Mark `job` as the active context on the remote service.
    SelectJob { job: JobHandle },
    StartMining {
        epoch: RunEpoch,
        job: JobHandle,
        params: MiningParams,
    },
    StartPolling { epoch: RunEpoch, job: JobHandle },
    StopPolling { epoch: RunEpoch },
    /// Emitted exactly once per successful run.
    ReportResult { epoch: RunEpoch, result: MiningResult },
    ReportFailure { epoch: RunEpoch, message: String },
}
