// src/sink/mod.rs
//
// Everything downstream of the frame path: the event envelope, the
// bounded hand-off queue, the append-only event log and the HTTP status
// notifier. Nothing in here may ever block or panic the frame loop.

pub mod dispatcher;
pub mod event_log;
pub mod notifier;

use crate::monitor::StatusChangeEvent;
use crate::types::{AnomalyEvent, CrossingEvent};
use serde::Serialize;

pub use dispatcher::{spawn_sink_worker, EventDispatcher};
pub use event_log::EventLog;
pub use notifier::StatusNotifier;

/// Envelope delivered to the sinks. Serialized one object per line into
/// the event log.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonitorEvent {
    Crossing(CrossingEvent),
    Anomaly(AnomalyEvent),
    StatusChange(StatusChangeEvent),
}

impl MonitorEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Crossing(_) => "crossing",
            Self::Anomaly(_) => "anomaly",
            Self::StatusChange(_) => "status_change",
        }
    }
}
