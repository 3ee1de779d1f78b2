use miner_core::{classify_phase, PhaseCounters, PhaseLabel, ReconcilerConfig, StatusSnapshot};

fn phases(snapshot: StatusSnapshot) -> PhaseCounters {
    snapshot.phases
}

#[test]
fn sampling_counter_is_shown_early() {
    let counters = phases(StatusSnapshot::running(10.0).with_phase("sampling", 3, 10));
    assert_eq!(
        classify_phase(10.0, &counters, &ReconcilerConfig::default()),
        Some(PhaseLabel::Sampling)
    );
}

#[test]
fn saving_counter_is_shown_at_the_end() {
    let counters = phases(StatusSnapshot::running(97.0).with_phase("saving", 2, 5));
    assert_eq!(
        classify_phase(97.0, &counters, &ReconcilerConfig::default()),
        Some(PhaseLabel::Saving)
    );
}

#[test]
fn undivided_search_degrades_to_none() {
    let counters = phases(StatusSnapshot::running(50.0).with_phase("search_trials", 0, 1));
    assert_eq!(
        classify_phase(50.0, &counters, &ReconcilerConfig::default()),
        None
    );
}

#[test]
fn counters_outside_the_band_are_not_used() {
    let config = ReconcilerConfig::default();
    // Sampling is still reported as active, but progress already sits in the search band.
    let counters = phases(
        StatusSnapshot::running(30.0)
            .with_phase("sampling", 5, 10)
            .with_phase("saving", 1, 4),
    );
    assert_eq!(classify_phase(30.0, &counters, &config), None);

    let counters = phases(StatusSnapshot::running(5.0).with_phase("search_trials", 3, 100));
    assert_eq!(classify_phase(5.0, &counters, &config), None);
}

#[test]
fn thresholds_come_from_config() {
    let config = ReconcilerConfig {
        search_band_start: 50.0,
        saving_band_start: 90.0,
        ..ReconcilerConfig::default()
    };
    let counters = phases(
        StatusSnapshot::running(0.0)
            .with_phase("sampling", 1, 4)
            .with_phase("search_trials", 1, 4)
            .with_phase("saving", 1, 4),
    );
    assert_eq!(classify_phase(30.0, &counters, &config), Some(PhaseLabel::Sampling));
    assert_eq!(classify_phase(60.0, &counters, &config), Some(PhaseLabel::Searching));
    assert_eq!(classify_phase(92.0, &counters, &config), Some(PhaseLabel::Saving));
}
