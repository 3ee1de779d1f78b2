use std::sync::Once;

use chrono::{TimeZone, Utc};
use miner_core::{
    update, AppState, DisplayedPhase, Effect, JobHandle, JobRecord, Msg, PhaseLabel, RunEpoch,
    SessionStatus, StatusSnapshot, WriterType,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn running_state() -> (AppState, RunEpoch) {
    let history = vec![JobRecord {
        job_id: JobHandle::new("nx-1"),
        writer_type: WriterType::Networkx,
        node_count: Some(10),
        edge_count: Some(20),
        imported_on: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        schema: None,
    }];
    let (state, _) = update(
        AppState::new(),
        Msg::HistoryLoaded {
            selected_job_id: Some("nx-1".to_string()),
            history,
        },
    );
    let (state, effects) = update(state, Msg::StartClicked);
    let epoch = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::StartMining { epoch, .. } => Some(*epoch),
            _ => None,
        })
        .expect("start effect");
    (state, epoch)
}

fn poll(state: AppState, epoch: RunEpoch, snapshot: StatusSnapshot) -> (AppState, Vec<Effect>) {
    update(state, Msg::StatusPolled { epoch, snapshot })
}

#[test]
fn lower_progress_never_regresses_the_display() {
    init_logging();
    let (state, epoch) = running_state();

    let (state, _) = poll(state, epoch, StatusSnapshot::running(40.0));
    let (state, _) = poll(state, epoch, StatusSnapshot::running(25.0));
    assert_eq!(state.view().progress, 40.0);

    let (state, _) = poll(state, epoch, StatusSnapshot::running(41.5));
    assert_eq!(state.view().progress, 41.5);
}

#[test]
fn out_of_range_progress_is_clamped() {
    init_logging();
    let (state, epoch) = running_state();

    let (state, effects) = poll(state, epoch, StatusSnapshot::running(-12.0));
    assert_eq!(state.view().progress, 0.0);
    assert!(effects.is_empty());

    // Clamped to 100, which is itself a completion signal.
    let (state, effects) = poll(state, epoch, StatusSnapshot::running(250.0));
    assert_eq!(state.view().progress, 100.0);
    assert_eq!(state.view().session, SessionStatus::Completed);
    assert_eq!(effects.len(), 2);
}

#[test]
fn stale_message_does_not_overwrite_a_newer_one() {
    init_logging();
    let (state, epoch) = running_state();

    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(60.0).with_message("Trial 60 of 100"),
    );
    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(30.0).with_message("Trial 30 of 100"),
    );
    assert_eq!(state.view().message, "Trial 60 of 100");

    // Within the tolerance the message still updates.
    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(59.6).with_message("Trial 61 of 100"),
    );
    assert_eq!(state.view().message, "Trial 61 of 100");
    assert_eq!(state.view().progress, 60.0);
}

#[test]
fn empty_messages_keep_the_previous_text() {
    init_logging();
    let (state, epoch) = running_state();

    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(5.0).with_message("Sampling neighborhoods"),
    );
    let (state, _) = poll(state, epoch, StatusSnapshot::running(6.0).with_message("  "));
    assert_eq!(state.view().message, "Sampling neighborhoods");
}

#[test]
fn phase_follows_progress_bands() {
    init_logging();
    let (state, epoch) = running_state();

    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(10.0).with_phase("sampling", 3, 10),
    );
    assert_eq!(
        state.view().phase,
        Some(DisplayedPhase {
            label: PhaseLabel::Sampling,
            current: 3,
            total: 10,
        })
    );

    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(50.0)
            .with_phase("sampling", 10, 10)
            .with_phase("search_trials", 0, 1),
    );
    assert_eq!(state.view().phase, None);

    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(55.0).with_phase("search_trials", 40, 100),
    );
    assert_eq!(
        state.view().phase.map(|phase| (phase.label, phase.current)),
        Some((PhaseLabel::Searching, 40))
    );
}

#[test]
fn phase_counter_display_is_monotonic() {
    init_logging();
    let (state, epoch) = running_state();

    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(50.0).with_phase("search_trials", 40, 100),
    );
    // Same band, counter went backwards (noisy backend).
    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(50.2).with_phase("search_trials", 35, 100),
    );
    assert_eq!(state.view().phase.map(|phase| phase.current), Some(40));
}

#[test]
fn stale_snapshot_does_not_touch_the_phase() {
    init_logging();
    let (state, epoch) = running_state();

    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(96.0).with_phase("saving", 1, 4),
    );
    let (state, _) = poll(
        state,
        epoch,
        StatusSnapshot::running(15.0).with_phase("sampling", 2, 10),
    );
    assert_eq!(
        state.view().phase.map(|phase| phase.label),
        Some(PhaseLabel::Saving)
    );
}

proptest! {
    #[test]
    fn displayed_progress_is_non_decreasing(values in proptest::collection::vec(-50.0f64..150.0, 1..40)) {
        let (mut state, epoch) = running_state();
        let mut previous = state.view().progress;
        for value in values {
            let (next, _) = poll(state, epoch, StatusSnapshot::running(value));
            let shown = next.view().progress;
            prop_assert!(shown >= previous);
            prop_assert!((0.0..=100.0).contains(&shown));
            previous = shown;
            state = next;
        }
    }
}
