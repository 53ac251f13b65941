// src/tracking/mod.rs

pub mod crossing;
pub mod store;

pub use crossing::{CrossingTracker, CrossingTrackerConfig, FrameOutput};
pub use store::{TrackStore, TrackUpdate, TrackedObject};
