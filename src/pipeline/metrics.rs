// src/pipeline/metrics.rs
//
// Production observability. Counts everything the engine decides so the
// end-of-run summary (and the logs) can answer "what happened" without
// replaying the capture.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct MonitorMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub detections_processed: Arc<AtomicU64>,
    pub malformed_dropped: Arc<AtomicU64>,
    pub crossings_total: Arc<AtomicU64>,
    pub anomalies_total: Arc<AtomicU64>,
    pub windows_closed: Arc<AtomicU64>,
    pub status_changes: Arc<AtomicU64>,
    pub events_dropped: Arc<AtomicU64>,
    pub notify_successes: Arc<AtomicU64>,
    pub notify_failures: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            detections_processed: Arc::new(AtomicU64::new(0)),
            malformed_dropped: Arc::new(AtomicU64::new(0)),
            crossings_total: Arc::new(AtomicU64::new(0)),
            anomalies_total: Arc::new(AtomicU64::new(0)),
            windows_closed: Arc::new(AtomicU64::new(0)),
            status_changes: Arc::new(AtomicU64::new(0)),
            events_dropped: Arc::new(AtomicU64::new(0)),
            notify_successes: Arc::new(AtomicU64::new(0)),
            notify_failures: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Frames processed per wall-clock second since startup.
    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            detections_processed: self.detections_processed.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            crossings_total: self.crossings_total.load(Ordering::Relaxed),
            anomalies_total: self.anomalies_total.load(Ordering::Relaxed),
            windows_closed: self.windows_closed.load(Ordering::Relaxed),
            status_changes: self.status_changes.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            notify_successes: self.notify_successes.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub detections_processed: u64,
    pub malformed_dropped: u64,
    pub crossings_total: u64,
    pub anomalies_total: u64,
    pub windows_closed: u64,
    pub status_changes: u64,
    pub events_dropped: u64,
    pub notify_successes: u64,
    pub notify_failures: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}
