use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use engine_logging::{engine_info, engine_warn};
use miner_core::{update, AppState, AppViewModel, MiningParams, Msg, SelectionView, SessionStatus};

use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::render::{self, Renderer};

const TICK: Duration = Duration::from_millis(75);

/// What the invocation is trying to get done.
#[derive(Debug, Clone, PartialEq)]
pub enum Goal {
    History,
    Select(String),
    Mine {
        job: Option<String>,
        max_wait: Option<Duration>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success,
    Failure(String),
}

impl Outcome {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure(_) => ExitCode::FAILURE,
        }
    }
}

/// Runs the message loop until `goal` is reached or has failed.
pub fn run(goal: Goal, config: AppConfig) -> anyhow::Result<Outcome> {
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(
        config.engine_config(),
        config.download_dir.clone(),
        msg_tx.clone(),
    )?;

    // Background tick to throttle rendering and deadline checks.
    let ticker_tx = msg_tx.clone();
    thread::spawn(move || {
        while ticker_tx.send(Msg::Tick).is_ok() {
            thread::sleep(TICK);
        }
    });

    let mut driver = Driver::new(goal, config.download_dir.is_some());
    for msg in driver.initial_messages(config.params) {
        let _ = msg_tx.send(msg);
    }

    let mut state = AppState::new();
    let mut renderer = Renderer::default();
    let mut render_pending = false;

    while let Ok(msg) = msg_rx.recv() {
        let is_tick = matches!(msg, Msg::Tick);
        let (next, effects) = update(state, msg);
        state = next;
        runner.enqueue(effects);

        let view = state.view();
        engine_logging::set_run_epoch(view.epoch.unwrap_or(0));
        render_pending |= state.consume_dirty();
        if is_tick && render_pending {
            renderer.render(&view);
            render_pending = false;
        }

        match driver.step(&view, Instant::now()) {
            Step::Continue => {}
            Step::Send(msg) => {
                let _ = msg_tx.send(msg);
            }
            Step::Finish(outcome) => {
                renderer.render(&view);
                report(&driver.goal, &view, &outcome);
                return Ok(outcome);
            }
        }
    }
    Err(anyhow!("message loop stopped unexpectedly"))
}

fn report(goal: &Goal, view: &AppViewModel, outcome: &Outcome) {
    if let Outcome::Failure(reason) = outcome {
        engine_warn!("Giving up: {}", reason);
        eprintln!("error: {reason}");
        return;
    }
    match goal {
        Goal::History => print!("{}", render::history_table(view)),
        Goal::Select(_) => {
            if let Some(job) = &view.active_job {
                println!("Active job: {job}");
            }
        }
        Goal::Mine { .. } => {
            if let Some(result) = &view.result {
                match result.patterns_count {
                    Some(count) => println!("Mining finished: {count} patterns"),
                    None => println!("Mining finished"),
                }
            }
            if let Some(Ok(path)) = &view.download {
                println!("Result saved to {}", path.display());
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Step {
    Continue,
    Send(Msg),
    Finish(Outcome),
}

/// Feeds the goal's messages into the loop and decides when it is done.
struct Driver {
    goal: Goal,
    expects_download: bool,
    started_at: Option<Instant>,
    cancel_sent: bool,
}

impl Driver {
    fn new(goal: Goal, expects_download: bool) -> Self {
        Self {
            goal,
            expects_download,
            started_at: None,
            cancel_sent: false,
        }
    }

    fn initial_messages(&self, params: MiningParams) -> Vec<Msg> {
        let mut msgs = vec![Msg::ParamsChanged(params), Msg::HistoryRequested];
        match &self.goal {
            Goal::History => {}
            Goal::Select(job_id) => msgs.push(Msg::JobChosen(job_id.clone())),
            Goal::Mine { job, .. } => msgs.extend(job.clone().map(Msg::JobChosen)),
        }
        msgs
    }

    fn step(&mut self, view: &AppViewModel, now: Instant) -> Step {
        if let Some(error) = &view.history_error {
            return Step::Finish(Outcome::Failure(format!("history unavailable: {error}")));
        }
        if !view.history_loaded {
            return Step::Continue;
        }

        match &self.goal {
            Goal::History => Step::Finish(Outcome::Success),
            Goal::Select(_) => match &view.selection {
                SelectionView::Acked(_) => Step::Finish(Outcome::Success),
                SelectionView::Failed { job, error } => Step::Finish(Outcome::Failure(format!(
                    "could not select {job}: {error}"
                ))),
                SelectionView::Pending(_) => Step::Continue,
                SelectionView::None => {
                    Step::Finish(Outcome::Failure("no imported jobs to select".to_string()))
                }
            },
            Goal::Mine { max_wait, .. } => {
                let max_wait = *max_wait;
                self.step_mining(view, now, max_wait)
            }
        }
    }

    fn step_mining(&mut self, view: &AppViewModel, now: Instant, max_wait: Option<Duration>) -> Step {
        let Some(started_at) = self.started_at else {
            if let Some(block) = &view.start_block {
                return Step::Finish(Outcome::Failure(render::start_block_reason(block)));
            }
            match &view.selection {
                SelectionView::Pending(_) => return Step::Continue,
                SelectionView::Failed { job, error } => {
                    return Step::Finish(Outcome::Failure(format!(
                        "could not select {job}: {error}"
                    )));
                }
                SelectionView::None | SelectionView::Acked(_) => {}
            }
            engine_info!("Starting mining on {:?}", view.active_job);
            self.started_at = Some(now);
            return Step::Send(Msg::StartClicked);
        };

        match view.session {
            SessionStatus::Idle => Step::Continue,
            SessionStatus::Running => {
                let overdue = max_wait.is_some_and(|limit| now.duration_since(started_at) >= limit);
                if overdue && !self.cancel_sent {
                    self.cancel_sent = true;
                    return Step::Send(Msg::CancelClicked);
                }
                Step::Continue
            }
            SessionStatus::Completed => match (&view.download, self.expects_download) {
                (None, true) => Step::Continue,
                (Some(Err(err)), _) => {
                    Step::Finish(Outcome::Failure(format!("download failed: {err}")))
                }
                _ => Step::Finish(Outcome::Success),
            },
            SessionStatus::Failed => Step::Finish(Outcome::Failure(
                view.failure.clone().unwrap_or_else(|| "mining failed".to_string()),
            )),
            SessionStatus::Cancelled => {
                Step::Finish(Outcome::Failure("run cancelled after time limit".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use miner_core::{JobHandle, ParamField, StartBlock, ValidationError};
    use pretty_assertions::assert_eq;

    fn loaded(job: &str) -> AppViewModel {
        AppViewModel {
            history_loaded: true,
            active_job: Some(JobHandle::new(job)),
            selection: SelectionView::Acked(JobHandle::new(job)),
            can_start: true,
            ..AppViewModel::default()
        }
    }

    fn mine(max_wait: Option<Duration>) -> Driver {
        Driver::new(
            Goal::Mine {
                job: None,
                max_wait,
            },
            true,
        )
    }

    #[test]
    fn waits_for_history_before_anything() {
        let mut driver = mine(None);
        assert_eq!(
            driver.step(&AppViewModel::default(), Instant::now()),
            Step::Continue
        );
    }

    #[test]
    fn mine_starts_once_then_waits_for_download() {
        let mut driver = mine(None);
        let now = Instant::now();
        let mut view = loaded("nx-1");
        assert_eq!(driver.step(&view, now), Step::Send(Msg::StartClicked));

        view.session = SessionStatus::Running;
        view.epoch = Some(1);
        assert_eq!(driver.step(&view, now), Step::Continue);

        view.session = SessionStatus::Completed;
        assert_eq!(driver.step(&view, now), Step::Continue);

        view.download = Some(Ok(PathBuf::from("results/nx-1_patterns.json")));
        assert_eq!(driver.step(&view, now), Step::Finish(Outcome::Success));
    }

    #[test]
    fn blocked_start_is_reported() {
        let mut driver = mine(None);
        let view = AppViewModel {
            history_loaded: true,
            start_block: Some(StartBlock::InvalidParams(ValidationError {
                field: ParamField::TrialCount,
                reason: "must be at least 1".to_string(),
            })),
            ..AppViewModel::default()
        };
        match driver.step(&view, Instant::now()) {
            Step::Finish(Outcome::Failure(reason)) => assert!(reason.contains("n_trials")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overdue_run_is_cancelled_once() {
        let mut driver = mine(Some(Duration::from_secs(5)));
        let start = Instant::now();
        let mut view = loaded("nx-1");
        assert_eq!(driver.step(&view, start), Step::Send(Msg::StartClicked));

        view.session = SessionStatus::Running;
        let later = start + Duration::from_secs(6);
        assert_eq!(driver.step(&view, later), Step::Send(Msg::CancelClicked));
        assert_eq!(driver.step(&view, later), Step::Continue);

        view.session = SessionStatus::Cancelled;
        assert!(matches!(
            driver.step(&view, later),
            Step::Finish(Outcome::Failure(_))
        ));
    }

    #[test]
    fn failed_run_surfaces_message() {
        let mut driver = mine(None);
        let now = Instant::now();
        let mut view = loaded("nx-1");
        driver.step(&view, now);

        view.session = SessionStatus::Failed;
        view.failure = Some("graph has no edges".to_string());
        assert_eq!(
            driver.step(&view, now),
            Step::Finish(Outcome::Failure("graph has no edges".to_string()))
        );
    }

    #[test]
    fn refused_selection_stops_mine_before_start() {
        let mut driver = mine(None);
        let mut view = loaded("nx-1");
        view.selection = SelectionView::Failed {
            job: JobHandle::new("nx-1"),
            error: "http status 404: no such job".to_string(),
        };
        match driver.step(&view, Instant::now()) {
            Step::Finish(Outcome::Failure(reason)) => {
                assert!(reason.contains("could not select nx-1"));
                assert!(reason.contains("no such job"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(driver.started_at.is_none());
    }

    #[test]
    fn select_finishes_on_ack() {
        let mut driver = Driver::new(Goal::Select("nx-2".to_string()), false);
        let mut view = loaded("nx-2");
        view.selection = SelectionView::Pending(JobHandle::new("nx-2"));
        assert_eq!(driver.step(&view, Instant::now()), Step::Continue);

        view.selection = SelectionView::Acked(JobHandle::new("nx-2"));
        assert_eq!(driver.step(&view, Instant::now()), Step::Finish(Outcome::Success));
    }

    #[test]
    fn history_error_ends_any_goal() {
        let mut driver = Driver::new(Goal::History, false);
        let view = AppViewModel {
            history_error: Some("network error: refused".to_string()),
            ..AppViewModel::default()
        };
        assert!(matches!(
            driver.step(&view, Instant::now()),
            Step::Finish(Outcome::Failure(_))
        ));
    }

    #[test]
    fn chosen_job_is_requested_up_front() {
        let driver = Driver::new(Goal::Select("mk-3".to_string()), false);
        let msgs = driver.initial_messages(MiningParams::default());
        assert_eq!(msgs.last(), Some(&Msg::JobChosen("mk-3".to_string())));
        assert_eq!(msgs[1], Msg::HistoryRequested);
    }
}
