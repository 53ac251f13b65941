// src/types.rs
//
// Shared data types: detection input from the upstream tracker and the
// event records the engine emits.

use serde::{Deserialize, Serialize};

// ============================================================================
// DETECTION INPUT
// ============================================================================

/// One tracked detection from the upstream model for a single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Stable track id assigned by the upstream tracker.
    pub id: u64,
    /// [x1, y1, x2, y2] pixels. A record with no box deserializes as NaN
    /// and is rejected by `is_well_formed` instead of failing the frame.
    #[serde(default = "missing_bbox")]
    pub bbox: [f32; 4],
    pub class_id: u32,
}

fn missing_bbox() -> [f32; 4] {
    [f32::NAN; 4]
}

impl Detection {
    pub fn centroid(&self) -> (f32, f32) {
        (
            (self.bbox[0] + self.bbox[2]) * 0.5,
            (self.bbox[1] + self.bbox[3]) * 0.5,
        )
    }

    /// Coordinates must be finite and the box non-inverted. Anything else
    /// is dropped before it can reach the track store.
    pub fn is_well_formed(&self) -> bool {
        self.bbox.iter().all(|v| v.is_finite())
            && self.bbox[2] >= self.bbox[0]
            && self.bbox[3] >= self.bbox[1]
    }
}

/// All detections the upstream model produced for one frame. An empty
/// detection list is a legal, frequent case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub frame_id: u64,
    pub timestamp_ms: f64,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

// ============================================================================
// EVENTS
// ============================================================================

/// A product crossed the monitoring boundary. Emitted at most once per
/// track id per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossingEvent {
    pub track_id: u64,
    pub class_id: u32,
    pub timestamp_ms: f64,
}

/// An object of a non-target class appeared on the line. Emitted at most
/// once per track id so a lingering object does not flood the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub track_id: u64,
    pub class_id: u32,
    pub timestamp_ms: f64,
}

/// Crossing count over one closed rate window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowSample {
    pub window_start_ms: f64,
    pub window_end_ms: f64,
    pub count: u32,
}

impl WindowSample {
    pub fn duration_ms(&self) -> f64 {
        self.window_end_ms - self.window_start_ms
    }
}
