use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use miner_core::{JobHandle, MiningParams, MiningResult, RunEpoch};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientSettings, MiningApi, ReqwestMiningApi};
use crate::persist::ResultWriter;
use crate::poller::{EventSink, PollSettings, StatusPoller};
use crate::{ApiError, EngineEvent};

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub client: ClientSettings,
    pub poll: PollSettings,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("mining client: {0}")]
    Client(#[from] ApiError),
    #[error("engine runtime: {0}")]
    Runtime(#[from] io::Error),
}

enum EngineCommand {
    FetchHistory,
    SelectJob {
        job: JobHandle,
    },
    StartMining {
        epoch: RunEpoch,
        job: JobHandle,
        params: MiningParams,
    },
    StartPolling {
        epoch: RunEpoch,
        job: JobHandle,
    },
    StopPolling {
        epoch: RunEpoch,
    },
    SaveResult {
        epoch: RunEpoch,
        result: MiningResult,
        dir: PathBuf,
    },
}

/// Runs remote calls and pollers on a background tokio runtime.
///
/// Commands go in through the handle; every outcome comes back through the
/// [`EventSink`]. Dropping the handle stops all pollers.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        let api = Arc::new(ReqwestMiningApi::new(config.client)?);
        Ok(Self::with_api(api, config.poll, sink)?)
    }

    pub fn with_api(
        api: Arc<dyn MiningApi>,
        poll: PollSettings,
        sink: Arc<dyn EventSink>,
    ) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("miner-engine-worker")
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("miner-engine".to_string())
            .spawn(move || {
                let mut pollers: HashMap<RunEpoch, CancellationToken> = HashMap::new();
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::StartPolling { epoch, job } => {
                            let poller = StatusPoller::new(epoch, job, &poll);
                            if let Some(previous) = pollers.insert(epoch, poller.cancel_token()) {
                                previous.cancel();
                            }
                            runtime.spawn(poller.run(api.clone(), sink.clone()));
                        }
                        EngineCommand::StopPolling { epoch } => {
                            if let Some(token) = pollers.remove(&epoch) {
                                engine_debug!("Stopping poller for run {}", epoch);
                                token.cancel();
                            }
                        }
                        command => {
                            let api = api.clone();
                            let sink = sink.clone();
                            runtime.spawn(async move {
                                handle_command(api.as_ref(), command, sink.as_ref()).await;
                            });
                        }
                    }
                }
                for token in pollers.values() {
                    token.cancel();
                }
                runtime.shutdown_timeout(Duration::from_secs(1));
            })?;

        Ok(Self { cmd_tx })
    }

    pub fn fetch_history(&self) {
        self.send(EngineCommand::FetchHistory);
    }

    pub fn select_job(&self, job: JobHandle) {
        self.send(EngineCommand::SelectJob { job });
    }

    pub fn start_mining(&self, epoch: RunEpoch, job: JobHandle, params: MiningParams) {
        self.send(EngineCommand::StartMining { epoch, job, params });
    }

    pub fn start_polling(&self, epoch: RunEpoch, job: JobHandle) {
        self.send(EngineCommand::StartPolling { epoch, job });
    }

    pub fn stop_polling(&self, epoch: RunEpoch) {
        self.send(EngineCommand::StopPolling { epoch });
    }

    /// Downloads the result and writes it into `dir`.
    pub fn save_result(&self, epoch: RunEpoch, result: MiningResult, dir: PathBuf) {
        self.send(EngineCommand::SaveResult { epoch, result, dir });
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            engine_warn!("Engine thread is gone; command dropped");
        }
    }
}

async fn handle_command(api: &dyn MiningApi, command: EngineCommand, sink: &dyn EventSink) {
    let delivered = match command {
        EngineCommand::FetchHistory => {
            let result = api.fetch_history().await;
            sink.emit(EngineEvent::HistoryLoaded(result))
        }
        EngineCommand::SelectJob { job } => {
            let result = api.select_job(&job).await;
            sink.emit(EngineEvent::JobSelected { job, result })
        }
        EngineCommand::StartMining { epoch, job, params } => {
            engine_info!("Starting mining for run {} on job {}", epoch, job);
            let result = api.start(&job, &params).await;
            sink.emit(EngineEvent::StartCompleted { epoch, result })
        }
        EngineCommand::SaveResult { epoch, result, dir } => {
            let saved = match api.download(&result.download).await {
                Ok(bytes) => ResultWriter::new(dir)
                    .write_result(&result, &bytes)
                    .map_err(|err| err.to_string()),
                Err(err) => Err(err.to_string()),
            };
            sink.emit(EngineEvent::ResultSaved {
                epoch,
                result: saved,
            })
        }
        EngineCommand::StartPolling { .. } | EngineCommand::StopPolling { .. } => true,
    };
    if !delivered {
        engine_debug!("Event receiver is gone; engine result dropped");
    }
}
