//! Miner engine: remote service client, status polling and effect execution.
mod client;
mod engine;
mod persist;
mod poller;
mod types;
mod wire;

pub use client::{ClientSettings, MiningApi, ReqwestMiningApi};
pub use engine::{EngineConfig, EngineError, EngineHandle};
pub use persist::{ensure_output_dir, result_filename, PersistError, ResultWriter};
pub use poller::{ChannelEventSink, EventSink, PollSettings, StatusPoller};
pub use types::{ApiError, EngineEvent, FailureKind, History};
pub use wire::{error_message, parse_history, parse_start_response, parse_status};
