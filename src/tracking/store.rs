// src/tracking/store.rs
//
// Per-track state across a monitoring session. The store is the single
// owner of every TrackedObject; the frame path is its only writer, so a
// per-id update is naturally atomic. Stale tracks are swept every frame;
// upstream ids are never explicitly closed, so without eviction the map
// grows for the life of the session.
//
// Known limitation: ids are assumed not to be recycled within a session.
// If the upstream tracker reuses an id after losing the original object,
// the crossed flag suppresses the second object's crossing.

use std::collections::HashMap;
use tracing::debug;

/// One physical object under observation.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    pub id: u64,
    /// Last observed centroid.
    pub cx: f32,
    pub cy: f32,
    pub class_id: u32,
    /// Set once when the object is counted; never cleared within a session.
    pub crossed: bool,
    /// Set once when the object is reported as an anomaly.
    pub anomaly_reported: bool,
    pub last_seen_frame: u64,
    pub last_seen_ms: f64,
}

/// Snapshot handed back by `upsert`: the pre-update position plus the
/// stored flags, so the caller can compare previous-vs-current coordinates
/// without holding a reference into the map.
#[derive(Debug, Clone, Copy)]
pub struct TrackUpdate {
    /// Equal to the new position on first sighting, which guarantees the
    /// crossing gate cannot fire for an object that spawns past the line.
    pub prev_cx: f32,
    pub prev_cy: f32,
    pub crossed: bool,
    pub anomaly_reported: bool,
    pub first_sighting: bool,
}

#[derive(Debug, Default)]
pub struct TrackStore {
    tracks: HashMap<u64, TrackedObject>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation of `id`, creating the track if unseen.
    /// Position and last-seen are updated in place; the crossed/anomaly
    /// flags are preserved and returned alongside the previous position.
    pub fn upsert(
        &mut self,
        id: u64,
        cx: f32,
        cy: f32,
        class_id: u32,
        frame_id: u64,
        now_ms: f64,
    ) -> TrackUpdate {
        match self.tracks.get_mut(&id) {
            Some(track) => {
                let update = TrackUpdate {
                    prev_cx: track.cx,
                    prev_cy: track.cy,
                    crossed: track.crossed,
                    anomaly_reported: track.anomaly_reported,
                    first_sighting: false,
                };
                track.cx = cx;
                track.cy = cy;
                track.class_id = class_id;
                track.last_seen_frame = frame_id;
                track.last_seen_ms = now_ms;
                update
            }
            None => {
                self.tracks.insert(
                    id,
                    TrackedObject {
                        id,
                        cx,
                        cy,
                        class_id,
                        crossed: false,
                        anomaly_reported: false,
                        last_seen_frame: frame_id,
                        last_seen_ms: now_ms,
                    },
                );
                TrackUpdate {
                    prev_cx: cx,
                    prev_cy: cy,
                    crossed: false,
                    anomaly_reported: false,
                    first_sighting: true,
                }
            }
        }
    }

    /// Idempotent. Marking an id that was already evicted is a no-op,
    /// since eviction racing with a late detection is expected under load.
    pub fn mark_crossed(&mut self, id: u64) {
        if let Some(track) = self.tracks.get_mut(&id) {
            track.crossed = true;
        }
    }

    /// Idempotent, same eviction semantics as `mark_crossed`.
    pub fn mark_anomaly(&mut self, id: u64) {
        if let Some(track) = self.tracks.get_mut(&id) {
            track.anomaly_reported = true;
        }
    }

    /// Remove every track unseen for longer than `max_idle_ms`.
    /// Returns the number of tracks removed.
    pub fn evict(&mut self, now_ms: f64, max_idle_ms: f64) -> usize {
        let before = self.tracks.len();
        self.tracks
            .retain(|_, track| now_ms - track.last_seen_ms <= max_idle_ms);
        let evicted = before - self.tracks.len();
        if evicted > 0 {
            debug!("Evicted {} stale track(s), {} live", evicted, self.tracks.len());
        }
        evicted
    }

    pub fn get(&self, id: u64) -> Option<&TrackedObject> {
        self.tracks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
