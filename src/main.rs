// src/main.rs

mod boundary;
mod config;
mod detection_source;
mod monitor;
mod pipeline;
mod sink;
mod tracking;
mod types;

use anyhow::{Context, Result};
use boundary::Boundary;
use config::Config;
use detection_source::{DetectionSource, JsonlReplaySource};
use pipeline::{MonitorMetrics, MonitorSession};
use sink::{spawn_sink_worker, EventLog, StatusNotifier};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("🏭 Conveyor Monitor starting");
    config.validate()?;
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Boundary: {} line at factor {:.2} | targets {:?} | expected {}±{} per {:.0}s window",
        config.boundary.axis.as_str(),
        config.boundary.offset_factor,
        config.detection.target_classes,
        config.production.expected_per_window,
        config.production.tolerance,
        config.production.window_secs
    );

    let metrics = MonitorMetrics::new();

    let event_log = EventLog::open(Path::new(&config.sink.event_log_path))?;
    info!("💾 Events will be appended to {}", event_log.path().display());

    let notifier = match &config.sink.notify_url {
        Some(url) => {
            info!("📡 Status notifications → {}", url);
            Some(StatusNotifier::new(url.clone(), config.sink.notify_timeout_secs)?)
        }
        None => {
            info!("⚪ Status notification disabled");
            None
        }
    };

    let (dispatcher, sink_worker) =
        spawn_sink_worker(config.sink.queue_capacity, event_log, notifier, metrics.clone());

    let captures = find_capture_files(&config.input.capture_dir)?;
    if captures.is_empty() {
        error!("No capture files found in {}", config.input.capture_dir);
        drop(dispatcher);
        let _ = sink_worker.await;
        return Ok(());
    }
    info!("Found {} capture file(s) to process", captures.len());

    for (idx, capture_path) in captures.iter().enumerate() {
        info!("========================================");
        info!(
            "Session {}/{}: {}",
            idx + 1,
            captures.len(),
            capture_path.display()
        );
        info!("========================================");

        match run_session(capture_path, &config, &dispatcher, &metrics) {
            Ok(summary) => {
                info!("✓ Session complete");
                summary.log();
            }
            Err(e) => {
                error!("Session failed for {}: {:#}", capture_path.display(), e);
            }
        }
    }

    // Let the worker drain everything still queued before reporting.
    drop(dispatcher);
    if sink_worker.await.is_err() {
        warn!("Sink worker terminated abnormally");
    }

    let summary = metrics.summary();
    info!("📊 Run summary: {}", serde_json::to_string(&summary)?);
    if summary.events_dropped > 0 {
        warn!(
            "{} event(s) were dropped at the sink queue",
            summary.events_dropped
        );
    }
    info!("Processing speed: {:.1} frames/s", summary.fps);

    Ok(())
}

fn run_session(
    capture_path: &Path,
    config: &Config,
    dispatcher: &sink::EventDispatcher,
    metrics: &MonitorMetrics,
) -> Result<pipeline::SessionSummary> {
    let mut source = JsonlReplaySource::open(capture_path)?;
    info!(
        "Capture frame size: {}x{}",
        source.frame_width(),
        source.frame_height()
    );

    let boundary = Boundary::from_frame(
        config.boundary.axis,
        config.boundary.offset_factor,
        source.frame_width(),
        source.frame_height(),
    );
    info!(
        "Counting line at {:.0}px ({})",
        boundary.position,
        boundary.axis.as_str()
    );

    let mut session =
        MonitorSession::new(config, boundary, dispatcher.clone(), metrics.clone());

    while let Some(frame) = source
        .next_frame()
        .with_context(|| format!("replaying {}", capture_path.display()))?
    {
        session.process_frame(&frame);
    }

    Ok(session.finish())
}

fn find_capture_files(dir: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext == "jsonl")
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    Ok(files)
}
