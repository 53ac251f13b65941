// src/config.rs

use crate::boundary::BoundaryAxis;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub boundary: BoundaryConfig,
    pub detection: DetectionConfig,
    pub production: ProductionConfig,
    pub sink: SinkConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory scanned for recorded detection captures (*.jsonl).
    pub capture_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    pub axis: BoundaryAxis,
    /// Line position as a fraction of the frame dimension along the axis.
    pub offset_factor: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Class ids counted as products; everything else is an anomaly.
    pub target_classes: Vec<u32>,
    /// Tracks unseen for this long are evicted from the store.
    pub track_idle_timeout_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionConfig {
    pub expected_per_window: u32,
    pub window_secs: f64,
    pub tolerance: u32,
    /// Crossings closer together than this are excluded from interval
    /// statistics (double-triggers from adjacent products).
    pub min_interval_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub event_log_path: String,
    /// HTTP endpoint notified on status changes; None disables notification.
    pub notify_url: Option<String>,
    pub notify_timeout_secs: u64,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config file {path}"))?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a meaningful session.
    /// Called once at startup; every other error path prefers local recovery.
    pub fn validate(&self) -> Result<()> {
        if !(self.boundary.offset_factor > 0.0 && self.boundary.offset_factor < 1.0) {
            bail!(
                "boundary.offset_factor must be in (0, 1), got {}",
                self.boundary.offset_factor
            );
        }
        if self.detection.target_classes.is_empty() {
            bail!("detection.target_classes must not be empty");
        }
        if self.detection.track_idle_timeout_secs <= 0.0 {
            bail!(
                "detection.track_idle_timeout_secs must be positive, got {}",
                self.detection.track_idle_timeout_secs
            );
        }
        if self.production.window_secs <= 0.0 {
            bail!(
                "production.window_secs must be positive, got {}",
                self.production.window_secs
            );
        }
        if self.production.min_interval_secs < 0.0 {
            bail!(
                "production.min_interval_secs must not be negative, got {}",
                self.production.min_interval_secs
            );
        }
        if self.sink.queue_capacity == 0 {
            bail!("sink.queue_capacity must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        serde_yaml::from_str(
            r#"
input: { capture_dir: captures }
boundary: { axis: vertical, offset_factor: 0.5 }
detection: { target_classes: [2], track_idle_timeout_secs: 5.0 }
production: { expected_per_window: 3, window_secs: 35.0, tolerance: 1, min_interval_secs: 0.5 }
sink: { event_log_path: logs/events.jsonl, notify_url: null, notify_timeout_secs: 5, queue_capacity: 256 }
logging: { level: info }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut cfg = valid();
        cfg.production.window_secs = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_offset_factor_bounds() {
        let mut cfg = valid();
        cfg.boundary.offset_factor = 1.0;
        assert!(cfg.validate().is_err());
        cfg.boundary.offset_factor = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_targets_rejected() {
        let mut cfg = valid();
        cfg.detection.target_classes.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_horizontal_axis_parses() {
        let cfg: BoundaryConfig =
            serde_yaml::from_str("axis: horizontal\noffset_factor: 0.7").unwrap();
        assert_eq!(cfg.axis, BoundaryAxis::Horizontal);
    }
}
