// src/pipeline/session.rs
//
// One monitoring session: tracker → aggregator → classifier per frame,
// with events handed off to the sink queue. All state is in-memory and
// rebuilt from scratch per session, so a restart always begins Nominal.

use crate::boundary::Boundary;
use crate::config::Config;
use crate::monitor::{
    CrossingIntervalStats, ProductionStatus, RateWindowAggregator, RateWindowConfig,
    StatusClassifier, StatusClassifierConfig,
};
use crate::pipeline::MonitorMetrics;
use crate::sink::{EventDispatcher, MonitorEvent};
use crate::tracking::{CrossingTracker, CrossingTrackerConfig};
use crate::types::{DetectionFrame, WindowSample};
use serde::Serialize;
use tracing::{debug, info};

pub struct MonitorSession {
    tracker: CrossingTracker,
    aggregator: RateWindowAggregator,
    classifier: StatusClassifier,
    dispatcher: EventDispatcher,
    metrics: MonitorMetrics,

    crossings: u64,
    anomalies: u64,
    last_timestamp_ms: f64,
    finished: bool,
}

impl MonitorSession {
    pub fn new(
        config: &Config,
        boundary: Boundary,
        dispatcher: EventDispatcher,
        metrics: MonitorMetrics,
    ) -> Self {
        let tracker = CrossingTracker::new(CrossingTrackerConfig {
            boundary,
            target_classes: config.detection.target_classes.iter().copied().collect(),
            idle_timeout_ms: config.detection.track_idle_timeout_secs * 1000.0,
        });
        let aggregator = RateWindowAggregator::new(RateWindowConfig {
            window_ms: config.production.window_secs * 1000.0,
            min_interval_ms: config.production.min_interval_secs * 1000.0,
        });
        let classifier = StatusClassifier::new(StatusClassifierConfig {
            expected: config.production.expected_per_window,
            tolerance: config.production.tolerance,
        });

        Self {
            tracker,
            aggregator,
            classifier,
            dispatcher,
            metrics,
            crossings: 0,
            anomalies: 0,
            last_timestamp_ms: 0.0,
            finished: false,
        }
    }

    pub fn process_frame(&mut self, frame: &DetectionFrame) {
        self.metrics.inc(&self.metrics.total_frames);
        self.metrics
            .add(&self.metrics.detections_processed, frame.detections.len() as u64);
        self.last_timestamp_ms = frame.timestamp_ms;

        // Close an expired window before this frame's events are recorded,
        // so every event lands in the window its timestamp belongs to.
        if let Some(sample) = self.aggregator.tick(frame.timestamp_ms) {
            self.on_window_closed(sample);
        }

        let malformed_before = self.tracker.malformed_dropped;
        let out = self.tracker.process_frame(frame);
        let malformed = self.tracker.malformed_dropped - malformed_before;
        if malformed > 0 {
            self.metrics.add(&self.metrics.malformed_dropped, malformed);
        }

        for event in out.crossings {
            self.crossings += 1;
            self.metrics.inc(&self.metrics.crossings_total);
            self.aggregator.record(&event);
            self.dispatcher.publish(MonitorEvent::Crossing(event));
        }
        for event in out.anomalies {
            self.anomalies += 1;
            self.metrics.inc(&self.metrics.anomalies_total);
            self.dispatcher.publish(MonitorEvent::Anomaly(event));
        }
    }

    /// End the session: flush the final partial window through the
    /// classifier and return the summary. Idempotent.
    pub fn finish(&mut self) -> SessionSummary {
        if !self.finished {
            self.finished = true;
            if let Some(sample) = self.aggregator.flush(self.last_timestamp_ms) {
                self.on_window_closed(sample);
            }
        }

        SessionSummary {
            crossings: self.crossings,
            anomalies: self.anomalies,
            malformed_dropped: self.tracker.malformed_dropped,
            final_status: self.classifier.published(),
            interval_stats: self.aggregator.interval_stats(),
        }
    }

    fn on_window_closed(&mut self, sample: WindowSample) {
        self.metrics.inc(&self.metrics.windows_closed);
        debug!(
            "Window closed: {} crossing(s) in {:.1}s",
            sample.count,
            sample.duration_ms() / 1000.0
        );

        if let Some(change) = self.classifier.on_sample(&sample) {
            self.metrics.inc(&self.metrics.status_changes);
            self.dispatcher.publish(MonitorEvent::StatusChange(change));
        }
    }

    pub fn status(&self) -> ProductionStatus {
        self.classifier.published()
    }
}

/// End-of-session numbers for the run report.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub crossings: u64,
    pub anomalies: u64,
    pub malformed_dropped: u64,
    pub final_status: ProductionStatus,
    pub interval_stats: CrossingIntervalStats,
}

impl SessionSummary {
    pub fn log(&self) {
        info!("  Crossings counted: {}", self.crossings);
        info!("  Anomalies reported: {}", self.anomalies);
        if self.malformed_dropped > 0 {
            info!("  Malformed detections dropped: {}", self.malformed_dropped);
        }
        info!("  Final status: {}", self.final_status);
        if self.interval_stats.total_intervals > 0 {
            info!(
                "  Crossing spacing: mean {:.2}s, std dev {:.2}s over {} interval(s)",
                self.interval_stats.mean_ms / 1000.0,
                self.interval_stats.std_dev_ms / 1000.0,
                self.interval_stats.total_intervals
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryAxis;
    use crate::types::Detection;
    use tokio::sync::mpsc;

    // Config for the scenarios: targets {2}, boundary 0.5 on a 1000px-wide
    // frame, expected 3 per 10s window, tolerance 1.
    fn test_config() -> Config {
        serde_yaml::from_str(
            r#"
input: { capture_dir: captures }
boundary: { axis: vertical, offset_factor: 0.5 }
detection: { target_classes: [2], track_idle_timeout_secs: 60.0 }
production: { expected_per_window: 3, window_secs: 10.0, tolerance: 1, min_interval_secs: 0.0 }
sink: { event_log_path: logs/events.jsonl, notify_url: null, notify_timeout_secs: 5, queue_capacity: 256 }
logging: { level: info }
"#,
        )
        .unwrap()
    }

    fn session_with_receiver() -> (MonitorSession, mpsc::Receiver<MonitorEvent>) {
        let config = test_config();
        let metrics = MonitorMetrics::new();
        let (tx, rx) = mpsc::channel(64);
        let dispatcher = EventDispatcher::new(tx, metrics.clone());
        let boundary = Boundary::from_frame(BoundaryAxis::Vertical, 0.5, 1000, 720);
        (
            MonitorSession::new(&config, boundary, dispatcher, metrics),
            rx,
        )
    }

    fn det(id: u64, cx: f32, class_id: u32) -> Detection {
        Detection {
            id,
            bbox: [cx - 20.0, 280.0, cx + 20.0, 320.0],
            class_id,
        }
    }

    fn frame(frame_id: u64, timestamp_ms: f64, detections: Vec<Detection>) -> DetectionFrame {
        DetectionFrame {
            frame_id,
            timestamp_ms,
            detections,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_single_crossing_classifies_too_slow() {
        let (mut session, mut rx) = session_with_receiver();

        // Track 7 moves 400 → 520 over the boundary at 500.
        session.process_frame(&frame(1, 0.0, vec![det(7, 400.0, 2)]));
        session.process_frame(&frame(2, 33.0, vec![det(7, 520.0, 2)]));

        // Idle frames until the 10s window closes.
        for i in 3..=12 {
            session.process_frame(&frame(i, i as f64 * 1000.0, vec![]));
        }

        let events = drain(&mut rx);
        let crossings: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, MonitorEvent::Crossing(_)))
            .collect();
        assert_eq!(crossings.len(), 1);

        let changes: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::StatusChange(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous, ProductionStatus::Nominal);
        assert_eq!(changes[0].current, ProductionStatus::TooSlow);
    }

    #[test]
    fn test_three_crossings_stay_nominal() {
        let (mut session, mut rx) = session_with_receiver();

        session.process_frame(&frame(
            1,
            0.0,
            vec![det(1, 450.0, 2), det(2, 460.0, 2), det(3, 470.0, 2)],
        ));
        session.process_frame(&frame(
            2,
            33.0,
            vec![det(1, 510.0, 2), det(2, 520.0, 2), det(3, 530.0, 2)],
        ));
        for i in 3..=12 {
            session.process_frame(&frame(i, i as f64 * 1000.0, vec![]));
        }

        let events = drain(&mut rx);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, MonitorEvent::Crossing(_)))
                .count(),
            3
        );
        assert!(events
            .iter()
            .all(|e| !matches!(e, MonitorEvent::StatusChange(_))));
        assert_eq!(session.status(), ProductionStatus::Nominal);
    }

    #[test]
    fn test_anomaly_deduplicated_across_frames() {
        let (mut session, mut rx) = session_with_receiver();

        session.process_frame(&frame(1, 0.0, vec![det(42, 400.0, 9)]));
        session.process_frame(&frame(2, 33.0, vec![det(42, 420.0, 9)]));

        let events = drain(&mut rx);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, MonitorEvent::Anomaly(_)))
                .count(),
            1
        );
    }

    #[test]
    fn test_finish_flushes_partial_window() {
        let (mut session, mut rx) = session_with_receiver();

        // One crossing, then the session is cancelled after 5s. The
        // partial window must still classify (count 1 → TooSlow).
        session.process_frame(&frame(1, 0.0, vec![det(7, 400.0, 2)]));
        session.process_frame(&frame(2, 33.0, vec![det(7, 520.0, 2)]));
        session.process_frame(&frame(3, 5000.0, vec![]));

        let summary = session.finish();
        assert_eq!(summary.crossings, 1);
        assert_eq!(summary.final_status, ProductionStatus::TooSlow);

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, MonitorEvent::StatusChange(_))));
    }

    #[test]
    fn test_persistent_stoppage_pages_once_then_recovers() {
        let (mut session, mut rx) = session_with_receiver();

        // Four empty windows, then a healthy one.
        for i in 0..=40 {
            session.process_frame(&frame(i, i as f64 * 1000.0, vec![]));
        }
        let stop_events = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, MonitorEvent::StatusChange(_)))
            .count();
        assert_eq!(stop_events, 1, "one page per incident, not per window");

        // Three crossings inside the next window → recovery transition.
        session.process_frame(&frame(
            41,
            41_000.0,
            vec![det(10, 450.0, 2), det(11, 460.0, 2), det(12, 470.0, 2)],
        ));
        session.process_frame(&frame(
            42,
            41_033.0,
            vec![det(10, 510.0, 2), det(11, 520.0, 2), det(12, 530.0, 2)],
        ));
        for i in 43..=55 {
            session.process_frame(&frame(i, i as f64 * 1000.0, vec![]));
        }

        let changes: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                MonitorEvent::StatusChange(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous, ProductionStatus::Stopped);
        assert_eq!(changes[0].current, ProductionStatus::Nominal);
    }
}
