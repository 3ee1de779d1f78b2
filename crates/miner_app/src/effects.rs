use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use engine_logging::{engine_info, engine_warn};
use miner_core::{Effect, Msg};
use miner_engine::{EngineConfig, EngineEvent, EngineHandle, EventSink};

/// Executes effects produced by `update` against the engine.
pub struct EffectRunner {
    engine: EngineHandle,
    download_dir: Option<PathBuf>,
}

impl EffectRunner {
    pub fn new(
        config: EngineConfig,
        download_dir: Option<PathBuf>,
        msg_tx: mpsc::Sender<Msg>,
    ) -> anyhow::Result<Self> {
        let sink = Arc::new(MsgSink { tx: msg_tx });
        let engine = EngineHandle::new(config, sink)?;
        Ok(Self {
            engine,
            download_dir,
        })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchHistory => self.engine.fetch_history(),
                Effect::SelectJob { job } => {
                    engine_info!("Selecting job {}", job);
                    self.engine.select_job(job);
                }
                Effect::StartMining { epoch, job, params } => {
                    self.engine.start_mining(epoch, job, params);
                }
                Effect::StartPolling { epoch, job } => self.engine.start_polling(epoch, job),
                Effect::StopPolling { epoch } => self.engine.stop_polling(epoch),
                Effect::ReportResult { epoch, result } => match &self.download_dir {
                    Some(dir) => {
                        engine_info!("Saving result of run {} into {:?}", epoch, dir);
                        self.engine.save_result(epoch, result, dir.clone());
                    }
                    None => engine_info!("Run {} finished; download skipped", epoch),
                },
                Effect::ReportFailure { epoch, message } => {
                    engine_warn!("Run {} reported failure: {}", epoch, message);
                }
            }
        }
    }
}

/// Turns engine events into messages for the app loop.
struct MsgSink {
    tx: mpsc::Sender<Msg>,
}

impl EventSink for MsgSink {
    fn emit(&self, event: EngineEvent) -> bool {
        self.tx.send(event_to_msg(event)).is_ok()
    }
}

fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::HistoryLoaded(Ok(history)) => Msg::HistoryLoaded {
            selected_job_id: history.selected_job_id,
            history: history.records,
        },
        EngineEvent::HistoryLoaded(Err(err)) => Msg::HistoryFailed(err.to_string()),
        EngineEvent::JobSelected { job, result } => Msg::JobSelectionAcked {
            job,
            error: result.err().map(|err| err.to_string()),
        },
        EngineEvent::Status { epoch, snapshot } => Msg::StatusPolled { epoch, snapshot },
        EngineEvent::StartCompleted {
            epoch,
            result: Ok(response),
        } => Msg::StartResolved { epoch, response },
        EngineEvent::StartCompleted {
            epoch,
            result: Err(err),
        } => {
            engine_warn!("Start call for run {} failed: {}", epoch, err);
            Msg::StartFailed {
                epoch,
                error: err.user_message().map(str::to_string),
            }
        }
        EngineEvent::ResultSaved { epoch, result } => Msg::ResultDownloaded { epoch, result },
    }
}
