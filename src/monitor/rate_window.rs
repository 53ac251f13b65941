// src/monitor/rate_window.rs
//
// Buckets crossing events into fixed-duration, non-overlapping windows.
// The caller ticks at least once per frame *before* recording that frame's
// events, so an event's timestamp always lands in the currently open
// window and no event is ever attributed to two windows. A window that
// closes with zero crossings still produces a sample; that zero is what
// drives the Stopped classification downstream.
//
// Also keeps the inter-crossing interval statistics reported at session
// end. Intervals below the configured debounce threshold (two products
// touching on the belt) are excluded from the statistics; they still
// count toward window totals.

use crate::types::{CrossingEvent, WindowSample};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct RateWindowConfig {
    pub window_ms: f64,
    /// Minimum gap between crossings for the interval to enter the stats.
    pub min_interval_ms: f64,
}

#[derive(Debug)]
pub struct RateWindowAggregator {
    config: RateWindowConfig,
    /// None until the first tick/record opens the initial window.
    window_start_ms: Option<f64>,
    count: u32,

    last_cross_ms: Option<f64>,
    intervals_ms: Vec<f64>,
}

impl RateWindowAggregator {
    pub fn new(config: RateWindowConfig) -> Self {
        Self {
            config,
            window_start_ms: None,
            count: 0,
            last_cross_ms: None,
            intervals_ms: Vec::new(),
        }
    }

    /// Accumulate one crossing into the open window.
    pub fn record(&mut self, event: &CrossingEvent) {
        self.window_start_ms.get_or_insert(event.timestamp_ms);
        self.count += 1;

        if let Some(last) = self.last_cross_ms {
            let gap = event.timestamp_ms - last;
            if gap >= self.config.min_interval_ms {
                self.intervals_ms.push(gap);
            }
        }
        self.last_cross_ms = Some(event.timestamp_ms);
    }

    /// Close the window if it has run its full duration. Returns the sample
    /// for the closed window; the next window opens at `now_ms`.
    pub fn tick(&mut self, now_ms: f64) -> Option<WindowSample> {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        if now_ms - start < self.config.window_ms {
            return None;
        }
        let sample = WindowSample {
            window_start_ms: start,
            window_end_ms: now_ms,
            count: self.count,
        };
        self.window_start_ms = Some(now_ms);
        self.count = 0;
        Some(sample)
    }

    /// Close the final partial window at session end. Returns None when the
    /// window is both empty and zero-length (nothing was ever observed).
    pub fn flush(&mut self, now_ms: f64) -> Option<WindowSample> {
        let start = self.window_start_ms?;
        if self.count == 0 && now_ms <= start {
            return None;
        }
        let sample = WindowSample {
            window_start_ms: start,
            window_end_ms: now_ms,
            count: self.count,
        };
        self.window_start_ms = Some(now_ms);
        self.count = 0;
        Some(sample)
    }

    pub fn interval_stats(&self) -> CrossingIntervalStats {
        let n = self.intervals_ms.len();
        if n < 2 {
            return CrossingIntervalStats::default();
        }
        let mean = self.intervals_ms.iter().sum::<f64>() / n as f64;
        let variance = self
            .intervals_ms
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n as f64;
        CrossingIntervalStats {
            mean_ms: mean,
            std_dev_ms: variance.sqrt(),
            total_intervals: n,
        }
    }
}

/// Spacing statistics between consecutive crossings, for the session
/// summary. A steady belt has a low standard deviation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CrossingIntervalStats {
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub total_intervals: usize,
}
