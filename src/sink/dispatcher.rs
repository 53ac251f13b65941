// src/sink/dispatcher.rs
//
// Bounded hand-off between the synchronous frame path and the async sink
// worker. The producer side never waits: when the queue is full the newest
// event is dropped, counted, and logged. Losing an event under backpressure
// is acceptable; stalling frame processing is not.

use super::{EventLog, MonitorEvent, StatusNotifier};
use crate::pipeline::MonitorMetrics;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::Sender<MonitorEvent>,
    metrics: MonitorMetrics,
}

impl EventDispatcher {
    pub fn new(tx: mpsc::Sender<MonitorEvent>, metrics: MonitorMetrics) -> Self {
        Self { tx, metrics }
    }

    /// Non-blocking publish from the frame path.
    pub fn publish(&self, event: MonitorEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.metrics.inc(&self.metrics.events_dropped);
                warn!("Sink queue full, dropping {} event", event.kind());
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.metrics.inc(&self.metrics.events_dropped);
                warn!("Sink worker gone, dropping {} event", event.kind());
            }
        }
    }
}

/// Spawn the worker that drains the queue into the log file and, for
/// status changes, the HTTP notifier. Returns the producer handle and the
/// worker's join handle; the worker exits when every dispatcher clone has
/// been dropped and the queue is drained.
pub fn spawn_sink_worker(
    capacity: usize,
    mut event_log: EventLog,
    mut notifier: Option<StatusNotifier>,
    metrics: MonitorMetrics,
) -> (EventDispatcher, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<MonitorEvent>(capacity);
    let dispatcher = EventDispatcher::new(tx, metrics.clone());

    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = event_log.append(&event) {
                error!("Event log append failed: {:#}", e);
            }

            if let MonitorEvent::StatusChange(ref change) = event {
                if let Some(notifier) = notifier.as_mut() {
                    notifier.notify(change, &metrics).await;
                }
            }
        }
    });

    (dispatcher, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CrossingEvent;
    use std::sync::atomic::Ordering;

    fn crossing(track_id: u64) -> MonitorEvent {
        MonitorEvent::Crossing(CrossingEvent {
            track_id,
            class_id: 2,
            timestamp_ms: 0.0,
        })
    }

    #[test]
    fn test_full_queue_drops_newest_without_blocking() {
        let metrics = MonitorMetrics::new();
        let (tx, _rx) = mpsc::channel(1);
        let dispatcher = EventDispatcher::new(tx, metrics.clone());

        dispatcher.publish(crossing(1)); // fills the queue
        dispatcher.publish(crossing(2)); // dropped
        dispatcher.publish(crossing(3)); // dropped

        assert_eq!(metrics.events_dropped.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_closed_channel_counts_as_dropped() {
        let metrics = MonitorMetrics::new();
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let dispatcher = EventDispatcher::new(tx, metrics.clone());

        dispatcher.publish(crossing(1));
        assert_eq!(metrics.events_dropped.load(Ordering::Relaxed), 1);
    }
}
