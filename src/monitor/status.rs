// src/monitor/status.rs
//
// Hysteresis state machine mapping window samples to a production status.
// A candidate status is computed for every window, but a StatusChangeEvent
// fires only when the candidate differs from the last *published* status:
// a stoppage that persists for ten windows pages the operator once, and
// recovery always produces its own distinguishing transition.
//
// The classifier is the sole owner of the published state; everything
// downstream learns about it through the events it emits.

use crate::types::WindowSample;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionStatus {
    Nominal,
    TooFast,
    TooSlow,
    Stopped,
}

impl ProductionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nominal => "NOMINAL",
            Self::TooFast => "TOO_FAST",
            Self::TooSlow => "TOO_SLOW",
            Self::Stopped => "STOPPED",
        }
    }
}

impl std::fmt::Display for ProductionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Published-status transition. Emitted once per genuine change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub previous: ProductionStatus,
    pub current: ProductionStatus,
    pub timestamp_ms: f64,
}

#[derive(Debug, Clone)]
pub struct StatusClassifierConfig {
    /// Expected crossings per window on a healthy line.
    pub expected: u32,
    /// Margin of error around `expected` still considered nominal.
    pub tolerance: u32,
}

pub struct StatusClassifier {
    config: StatusClassifierConfig,
    /// Starts Nominal: the line is assumed healthy until the first closed
    /// window proves otherwise, so startup never pages anyone.
    published: ProductionStatus,
}

impl StatusClassifier {
    pub fn new(config: StatusClassifierConfig) -> Self {
        Self {
            config,
            published: ProductionStatus::Nominal,
        }
    }

    /// Candidate status for a window count. When
    /// `expected - tolerance <= 0` the nominal band includes zero, which
    /// makes both Stopped and TooSlow unreachable by construction.
    pub fn classify(&self, count: u32) -> ProductionStatus {
        let lower = self.config.expected.saturating_sub(self.config.tolerance);
        let upper = self.config.expected + self.config.tolerance;

        if count > upper {
            ProductionStatus::TooFast
        } else if count >= lower {
            ProductionStatus::Nominal
        } else if count == 0 {
            ProductionStatus::Stopped
        } else {
            ProductionStatus::TooSlow
        }
    }

    /// Feed one closed window through the machine. Returns an event only on
    /// a genuine published transition.
    pub fn on_sample(&mut self, sample: &WindowSample) -> Option<StatusChangeEvent> {
        let candidate = self.classify(sample.count);

        if candidate == self.published {
            debug!(
                "Window count {} keeps status {}",
                sample.count, self.published
            );
            return None;
        }

        let event = StatusChangeEvent {
            previous: self.published,
            current: candidate,
            timestamp_ms: sample.window_end_ms,
        };
        info!(
            "🏭 Production status {} → {} (count {} in {:.1}s window)",
            event.previous,
            event.current,
            sample.count,
            sample.duration_ms() / 1000.0
        );
        self.published = candidate;
        Some(event)
    }

    pub fn published(&self) -> ProductionStatus {
        self.published
    }

    /// The boolean the notification backend consumes.
    pub fn functioning(&self) -> bool {
        self.published == ProductionStatus::Nominal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(expected: u32, tolerance: u32) -> StatusClassifier {
        StatusClassifier::new(StatusClassifierConfig {
            expected,
            tolerance,
        })
    }

    fn sample(count: u32, end_ms: f64) -> WindowSample {
        WindowSample {
            window_start_ms: end_ms - 10_000.0,
            window_end_ms: end_ms,
            count,
        }
    }

    #[test]
    fn test_classification_bands() {
        let c = classifier(3, 1);
        assert_eq!(c.classify(2), ProductionStatus::Nominal);
        assert_eq!(c.classify(3), ProductionStatus::Nominal);
        assert_eq!(c.classify(4), ProductionStatus::Nominal);
        assert_eq!(c.classify(5), ProductionStatus::TooFast);
        assert_eq!(c.classify(1), ProductionStatus::TooSlow);
        assert_eq!(c.classify(0), ProductionStatus::Stopped);
    }

    #[test]
    fn test_wide_tolerance_makes_slow_states_unreachable() {
        // expected - tolerance <= 0: the nominal band includes zero.
        let c = classifier(2, 2);
        assert_eq!(c.classify(0), ProductionStatus::Nominal);
        assert_eq!(c.classify(1), ProductionStatus::Nominal);
        assert_eq!(c.classify(5), ProductionStatus::TooFast);
    }

    #[test]
    fn test_starts_nominal_and_stays_quiet() {
        let mut c = classifier(3, 1);
        assert!(c.on_sample(&sample(3, 10_000.0)).is_none());
        assert!(c.functioning());
    }

    #[test]
    fn test_single_transition_then_silence() {
        let mut c = classifier(3, 1);

        let event = c.on_sample(&sample(0, 10_000.0)).expect("first stop pages");
        assert_eq!(event.previous, ProductionStatus::Nominal);
        assert_eq!(event.current, ProductionStatus::Stopped);

        // The stoppage persists: no further events, however long it lasts.
        for k in 2..10 {
            assert!(c.on_sample(&sample(0, k as f64 * 10_000.0)).is_none());
        }
        assert!(!c.functioning());
    }

    #[test]
    fn test_recovery_emits_distinguishing_transition() {
        let mut c = classifier(3, 1);
        c.on_sample(&sample(1, 10_000.0)); // Nominal → TooSlow

        let event = c.on_sample(&sample(3, 20_000.0)).expect("recovery pages");
        assert_eq!(event.previous, ProductionStatus::TooSlow);
        assert_eq!(event.current, ProductionStatus::Nominal);
        assert!(c.functioning());
    }

    #[test]
    fn test_transition_between_non_nominal_states_emits() {
        let mut c = classifier(3, 1);
        c.on_sample(&sample(0, 10_000.0)); // → Stopped
        let event = c.on_sample(&sample(1, 20_000.0)).expect("Stopped → TooSlow");
        assert_eq!(event.previous, ProductionStatus::Stopped);
        assert_eq!(event.current, ProductionStatus::TooSlow);
    }

    #[test]
    fn test_event_timestamp_is_window_end() {
        let mut c = classifier(3, 1);
        let event = c.on_sample(&sample(9, 30_000.0)).unwrap();
        assert_eq!(event.timestamp_ms, 30_000.0);
    }
}
