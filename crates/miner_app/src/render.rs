use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use miner_core::{AppViewModel, SessionStatus, StartBlock};

/// Draws run progress on stderr.
#[derive(Default)]
pub struct Renderer {
    bar: Option<ProgressBar>,
    drawn_epoch: Option<u64>,
}

impl Renderer {
    pub fn render(&mut self, view: &AppViewModel) {
        let Some(epoch) = view.epoch else {
            return;
        };
        if self.drawn_epoch != Some(epoch) {
            if let Some(old) = self.bar.take() {
                old.abandon();
            }
            self.bar = Some(make_progress_bar());
            self.drawn_epoch = Some(epoch);
        }
        let Some(bar) = &self.bar else {
            return;
        };

        bar.set_position(view.progress.round() as u64);
        bar.set_message(status_line(view));
        match view.session {
            SessionStatus::Running | SessionStatus::Idle => {}
            SessionStatus::Completed => bar.finish(),
            SessionStatus::Failed | SessionStatus::Cancelled => bar.abandon(),
        }
    }
}

fn make_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Phase and message shown next to the bar.
pub fn status_line(view: &AppViewModel) -> String {
    let phase = view
        .phase
        .map(|phase| format!("{} {}/{}", phase.label, phase.current, phase.total));
    match (phase, view.message.is_empty()) {
        (Some(phase), true) => phase,
        (Some(phase), false) => format!("{phase} | {}", view.message),
        (None, _) => view.message.clone(),
    }
}

pub fn history_table(view: &AppViewModel) -> String {
    let mut out = format!(
        "  {:<36} {:<9} {:>10} {:>10}  {}\n",
        "JOB", "WRITER", "NODES", "EDGES", "IMPORTED"
    );
    for row in &view.jobs {
        out.push_str(&format!(
            "{} {:<36} {:<9} {:>10} {:>10}  {}\n",
            if row.active { '*' } else { ' ' },
            row.job_id.as_str(),
            row.writer_type.as_str(),
            count(row.node_count),
            count(row.edge_count),
            row.imported_on.format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    out
}

pub fn start_block_reason(block: &StartBlock) -> String {
    match block {
        StartBlock::NoActiveJob => "no active job; import a graph or pass --job".to_string(),
        StartBlock::InvalidParams(err) => format!("invalid parameter {err}"),
    }
}

fn count(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |n| n.to_string())
}
