// src/tracking/crossing.rs
//
// Consumes one frame's detections and turns them into crossing and
// anomaly events. Each track is independent, so processing order within
// a frame does not matter. The crossed flag makes a crossing a one-shot
// event per track: boundary jitter around the line re-fires the geometric
// gate but never the event.

use crate::boundary::{has_crossed, Boundary};
use crate::types::{AnomalyEvent, CrossingEvent, DetectionFrame};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::store::TrackStore;

#[derive(Debug, Clone)]
pub struct CrossingTrackerConfig {
    pub boundary: Boundary,
    /// Class ids counted as products.
    pub target_classes: HashSet<u32>,
    /// Tracks unseen for longer than this are evicted every frame.
    pub idle_timeout_ms: f64,
}

/// Events produced by one frame.
#[derive(Debug, Default)]
pub struct FrameOutput {
    pub crossings: Vec<CrossingEvent>,
    pub anomalies: Vec<AnomalyEvent>,
}

pub struct CrossingTracker {
    config: CrossingTrackerConfig,
    store: TrackStore,

    // ── Diagnostics ──
    /// Detections dropped for malformed coordinates. Never fatal.
    pub malformed_dropped: u64,
}

impl CrossingTracker {
    pub fn new(config: CrossingTrackerConfig) -> Self {
        Self {
            config,
            store: TrackStore::new(),
            malformed_dropped: 0,
        }
    }

    pub fn process_frame(&mut self, frame: &DetectionFrame) -> FrameOutput {
        let mut out = FrameOutput::default();

        // Sweep first so a track that went idle past the timeout cannot
        // lend its stale position to a reappearing id this frame.
        self.store
            .evict(frame.timestamp_ms, self.config.idle_timeout_ms);

        for det in &frame.detections {
            if !det.is_well_formed() {
                self.malformed_dropped += 1;
                debug!(
                    "Dropping malformed detection (track {}, bbox {:?})",
                    det.id, det.bbox
                );
                continue;
            }

            let (cx, cy) = det.centroid();
            let update = self
                .store
                .upsert(det.id, cx, cy, det.class_id, frame.frame_id, frame.timestamp_ms);

            if self.config.target_classes.contains(&det.class_id) {
                let prev = self.config.boundary.coordinate_of(update.prev_cx, update.prev_cy);
                let curr = self.config.boundary.coordinate_of(cx, cy);

                if has_crossed(prev, curr, self.config.boundary.position) && !update.crossed {
                    self.store.mark_crossed(det.id);
                    info!(
                        "📦 Track {} crossed the line ({:.0} → {:.0} over {:.0})",
                        det.id, prev, curr, self.config.boundary.position
                    );
                    out.crossings.push(CrossingEvent {
                        track_id: det.id,
                        class_id: det.class_id,
                        timestamp_ms: frame.timestamp_ms,
                    });
                }
            } else if !update.anomaly_reported {
                self.store.mark_anomaly(det.id);
                warn!(
                    "⚠️  Unexpected class {} on the line (track {})",
                    det.class_id, det.id
                );
                out.anomalies.push(AnomalyEvent {
                    track_id: det.id,
                    class_id: det.class_id,
                    timestamp_ms: frame.timestamp_ms,
                });
            }
        }

        out
    }

    pub fn live_tracks(&self) -> usize {
        self.store.len()
    }
}
