// src/sink/notifier.rs
//
// HTTP status notification to the supervision backend. The backend only
// reacts to the `functioning` boolean flipping, so posts that repeat the
// last delivered value are skipped: TooFast → TooSlow changes status but
// not the boolean, and the event log already records the transition.
//
// One retry, short timeout, and every failure ends here as a warning.
// A dead backend must never be visible from the frame path.

use crate::monitor::{ProductionStatus, StatusChangeEvent};
use crate::pipeline::MonitorMetrics;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
struct StatusPayload {
    /// Correlation id echoed in backend logs.
    event_id: String,
    functioning: bool,
}

pub struct StatusNotifier {
    client: reqwest::Client,
    url: String,
    /// Last `functioning` value the backend acknowledged.
    last_delivered: Option<bool>,
}

impl StatusNotifier {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            url,
            last_delivered: None,
        })
    }

    pub async fn notify(&mut self, event: &StatusChangeEvent, metrics: &MonitorMetrics) {
        let functioning = event.current == ProductionStatus::Nominal;

        if self.last_delivered == Some(functioning) {
            debug!(
                "Skipping notification for {} → {}: backend already knows functioning={}",
                event.previous, event.current, functioning
            );
            return;
        }

        let payload = StatusPayload {
            event_id: uuid::Uuid::new_v4().to_string(),
            functioning,
        };

        // At most one retry; then the event is dropped with a warning.
        for attempt in 1..=2 {
            match self.client.post(&self.url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(
                        "📨 Notified backend: functioning={} ({} → {})",
                        functioning, event.previous, event.current
                    );
                    self.last_delivered = Some(functioning);
                    metrics.inc(&metrics.notify_successes);
                    return;
                }
                Ok(response) => {
                    warn!(
                        "Backend returned {} for status notification (attempt {}/2)",
                        response.status(),
                        attempt
                    );
                }
                Err(e) => {
                    warn!("Status notification failed (attempt {}/2): {}", attempt, e);
                }
            }
        }

        warn!(
            "Dropping status notification {} → {} after retry",
            event.previous, event.current
        );
        metrics.inc(&metrics.notify_failures);
    }
}
