use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// Identifies one job run. Strictly increasing per started run; 0 is never a run.
pub type RunEpoch = u64;

/// Opaque id of a mining job, as handed out by the remote history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobHandle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JobHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which writer produced an imported graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterType {
    Networkx,
    Mork,
    Other,
}

impl WriterType {
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "networkx" => WriterType::Networkx,
            "mork" => WriterType::Mork,
            _ => WriterType::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WriterType::Networkx => "networkx",
            WriterType::Mork => "mork",
            WriterType::Other => "other",
        }
    }
}

/// History entry for a previously imported graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: JobHandle,
    pub writer_type: WriterType,
    pub node_count: Option<u64>,
    pub edge_count: Option<u64>,
    pub imported_on: DateTime<Utc>,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    Running,
    Completed,
    #[default]
    Unknown,
}

impl StatusKind {
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" | "complete" | "done" | "finished" => StatusKind::Completed,
            "running" | "in_progress" | "started" => StatusKind::Running,
            _ => StatusKind::Unknown,
        }
    }
}

/// Completed sub-units of one mining phase out of the expected count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseCounter {
    pub current: u64,
    pub total: u64,
}

impl PhaseCounter {
    pub fn new(current: u64, total: u64) -> Self {
        Self { current, total }
    }

    /// A phase with `total <= 1` is not meaningfully subdivided.
    pub fn is_subdivided(&self) -> bool {
        self.total > 1
    }
}

/// Phase counters keyed by their wire name (`sampling`, `search_trials`, `saving`).
pub type PhaseCounters = BTreeMap<String, PhaseCounter>;

/// One normalized status poll result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusSnapshot {
    /// Raw progress; may be out of `[0, 100]`.
    pub progress: f64,
    pub message: Option<String>,
    pub status: StatusKind,
    pub phases: PhaseCounters,
    pub download_url: Option<String>,
    pub patterns_count: Option<u64>,
}

impl StatusSnapshot {
    pub fn running(progress: f64) -> Self {
        Self {
            progress,
            status: StatusKind::Running,
            ..Self::default()
        }
    }

    pub fn completed(progress: f64) -> Self {
        Self {
            progress,
            status: StatusKind::Completed,
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_phase(mut self, name: impl Into<String>, current: u64, total: u64) -> Self {
        self.phases
            .insert(name.into(), PhaseCounter::new(current, total));
        self
    }

    pub fn with_result(mut self, download_url: Option<&str>, patterns_count: Option<u64>) -> Self {
        self.download_url = download_url.map(ToOwned::to_owned);
        self.patterns_count = patterns_count;
        self
    }
}

/// Body of a successful start-job call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartResponse {
    pub download_url: Option<String>,
    pub patterns_count: Option<u64>,
}

/// Where the mined patterns can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadDescriptor {
    /// Reference given by the remote service (absolute URL or server-relative path).
    Explicit(String),
    /// No reference given; the per-job download endpoint is used.
    ForJob(JobHandle),
}

impl DownloadDescriptor {
    pub fn resolve(explicit: Option<&str>, job: &JobHandle) -> Self {
        match explicit.map(str::trim).filter(|s| !s.is_empty()) {
            Some(reference) => DownloadDescriptor::Explicit(reference.to_string()),
            None => DownloadDescriptor::ForJob(job.clone()),
        }
    }
}

/// Which signal finalized the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Poll,
    StartResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningResult {
    pub job: JobHandle,
    pub download: DownloadDescriptor,
    pub patterns_count: Option<u64>,
    pub source: ResultSource,
}
