use std::fmt;
use std::path::PathBuf;

use miner_core::{JobHandle, JobRecord, RunEpoch, StartResponse, StatusSnapshot};
use thiserror::Error;

/// Previously imported jobs as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct History {
    pub selected_job_id: Option<String>,
    pub records: Vec<JobRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    HistoryLoaded(Result<History, ApiError>),
    JobSelected {
        job: JobHandle,
        result: Result<(), ApiError>,
    },
    /// A poll tick produced a snapshot. Failed ticks are logged, never emitted.
    Status {
        epoch: RunEpoch,
        snapshot: StatusSnapshot,
    },
    StartCompleted {
        epoch: RunEpoch,
        result: Result<StartResponse, ApiError>,
    },
    ResultSaved {
        epoch: RunEpoch,
        result: Result<PathBuf, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Message worth showing to a user; `None` when only the failure kind is known.
    pub fn user_message(&self) -> Option<&str> {
        let message = self.message.trim();
        (!message.is_empty()).then_some(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    MalformedPayload,
    TooLarge { max_bytes: u64, actual: Option<u64> },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::MalformedPayload => write!(f, "malformed payload"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
        }
    }
}
