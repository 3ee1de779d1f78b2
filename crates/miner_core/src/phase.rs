use std::collections::BTreeMap;
use std::fmt;

use crate::{PhaseCounter, PhaseCounters};

/// Progress at which the trial search band begins.
pub const SEARCH_BAND_START: f64 = 20.0;
/// Progress at which the saving band begins.
pub const SAVING_BAND_START: f64 = 95.0;
/// How far below the best progress seen a snapshot may be and still update the message and phase.
pub const MESSAGE_TOLERANCE: f64 = 0.5;

/// Thresholds used by the reconciler and phase classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilerConfig {
    pub search_band_start: f64,
    pub saving_band_start: f64,
    pub message_tolerance: f64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            search_band_start: SEARCH_BAND_START,
            saving_band_start: SAVING_BAND_START,
            message_tolerance: MESSAGE_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseLabel {
    Sampling,
    Searching,
    Saving,
}

impl PhaseLabel {
    /// Wire names of the counter backing this phase, in lookup order.
    pub fn counter_keys(self) -> &'static [&'static str] {
        match self {
            PhaseLabel::Sampling => &["sampling"],
            PhaseLabel::Searching => &["search_trials", "searching"],
            PhaseLabel::Saving => &["saving"],
        }
    }

    pub fn counter(self, phases: &PhaseCounters) -> Option<PhaseCounter> {
        self.counter_keys()
            .iter()
            .find_map(|key| phases.get(*key).copied())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PhaseLabel::Sampling => "sampling",
            PhaseLabel::Searching => "searching",
            PhaseLabel::Saving => "saving",
        }
    }
}

impl fmt::Display for PhaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a progress value and the phase counters to the phase worth showing.
///
/// The progress band alone decides which phase is a candidate; that phase is
/// shown only when its counter is subdivided (`total > 1`). Counters of other
/// phases are never consulted, so two "active" counters cannot compete.
pub fn classify_phase(
    progress: f64,
    phases: &PhaseCounters,
    config: &ReconcilerConfig,
) -> Option<PhaseLabel> {
    let band = band_for(progress, config);
    band.counter(phases)
        .filter(PhaseCounter::is_subdivided)
        .map(|_| band)
}

fn band_for(progress: f64, config: &ReconcilerConfig) -> PhaseLabel {
    if progress >= config.saving_band_start {
        PhaseLabel::Saving
    } else if progress >= config.search_band_start {
        PhaseLabel::Searching
    } else {
        PhaseLabel::Sampling
    }
}

/// Phase as rendered: label plus a `current/total` fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayedPhase {
    pub label: PhaseLabel,
    pub current: u64,
    pub total: u64,
}

/// Highest `current` shown per phase during one run.
///
/// The memory is keyed by the counter's `total`: when the service reports a
/// different total for a phase, that phase starts a fresh count, so the shown
/// fraction never claims more than the current total.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhaseMemory {
    shown: BTreeMap<PhaseLabel, PhaseCounter>,
}

impl PhaseMemory {
    pub fn display(&mut self, label: PhaseLabel, counter: PhaseCounter) -> DisplayedPhase {
        let shown = self.shown.entry(label).or_insert(counter);
        if shown.total == counter.total {
            shown.current = shown.current.max(counter.current);
        } else {
            *shown = counter;
        }
        DisplayedPhase {
            label,
            current: shown.current.min(shown.total),
            total: shown.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(entries: &[(&str, u64, u64)]) -> PhaseCounters {
        entries
            .iter()
            .map(|(name, current, total)| (name.to_string(), PhaseCounter::new(*current, *total)))
            .collect()
    }

    #[test]
    fn band_edges_belong_to_the_later_phase() {
        let config = ReconcilerConfig::default();
        let phases = counters(&[("sampling", 1, 4), ("search_trials", 1, 4), ("saving", 1, 4)]);

        assert_eq!(classify_phase(19.99, &phases, &config), Some(PhaseLabel::Sampling));
        assert_eq!(classify_phase(20.0, &phases, &config), Some(PhaseLabel::Searching));
        assert_eq!(classify_phase(94.99, &phases, &config), Some(PhaseLabel::Searching));
        assert_eq!(classify_phase(95.0, &phases, &config), Some(PhaseLabel::Saving));
    }

    #[test]
    fn searching_alias_is_accepted() {
        let config = ReconcilerConfig::default();
        let phases = counters(&[("searching", 2, 8)]);
        assert_eq!(classify_phase(40.0, &phases, &config), Some(PhaseLabel::Searching));
    }

    #[test]
    fn memory_never_shows_a_smaller_count() {
        let mut memory = PhaseMemory::default();
        let first = memory.display(PhaseLabel::Searching, PhaseCounter::new(6, 10));
        let second = memory.display(PhaseLabel::Searching, PhaseCounter::new(4, 10));
        assert_eq!(first.current, 6);
        assert_eq!(second.current, 6);

        let other = memory.display(PhaseLabel::Saving, PhaseCounter::new(1, 3));
        assert_eq!(other.current, 1);
    }

    #[test]
    fn changed_total_restarts_the_count() {
        let mut memory = PhaseMemory::default();
        memory.display(PhaseLabel::Searching, PhaseCounter::new(6, 10));

        let shrunk = memory.display(PhaseLabel::Searching, PhaseCounter::new(4, 5));
        assert_eq!((shrunk.current, shrunk.total), (4, 5));

        let stale = memory.display(PhaseLabel::Searching, PhaseCounter::new(3, 5));
        assert_eq!((stale.current, stale.total), (4, 5));

        let grown = memory.display(PhaseLabel::Searching, PhaseCounter::new(2, 20));
        assert_eq!((grown.current, grown.total), (2, 20));
    }
}
