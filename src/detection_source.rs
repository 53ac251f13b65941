// src/detection_source.rs
//
// The consumed interface to the upstream detector/tracker. The engine only
// needs per-frame detection lists with a non-decreasing time reference; it
// does not care whether they come from a live model or a recorded capture.
//
// Capture format (JSONL): a header line `{"width": W, "height": H}`
// followed by one frame object per line:
//   {"frame_id": 1, "timestamp_ms": 33.3,
//    "detections": [{"id": 7, "bbox": [380,280,420,320], "class_id": 2}]}

use crate::types::DetectionFrame;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::warn;

pub trait DetectionSource {
    /// Next frame, or None when the stream ends. Empty detection lists are
    /// legal and frequent.
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>>;

    fn frame_width(&self) -> u32;
    fn frame_height(&self) -> u32;
}

#[derive(Debug, Deserialize)]
struct CaptureHeader {
    width: u32,
    height: u32,
}

/// Replays a recorded detection capture from disk.
pub struct JsonlReplaySource {
    path: PathBuf,
    reader: BufReader<File>,
    width: u32,
    height: u32,
    line_no: usize,
    last_timestamp_ms: f64,
}

impl JsonlReplaySource {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening capture {}", path.display()))?;
        let mut reader = BufReader::new(file);

        let mut header_line = String::new();
        reader
            .read_line(&mut header_line)
            .with_context(|| format!("reading capture header from {}", path.display()))?;
        let header: CaptureHeader = serde_json::from_str(header_line.trim())
            .with_context(|| format!("parsing capture header in {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            width: header.width,
            height: header.height,
            line_no: 1,
            last_timestamp_ms: 0.0,
        })
    }
}

impl DetectionSource for JsonlReplaySource {
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>> {
        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .with_context(|| format!("reading {}", self.path.display()))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let mut frame: DetectionFrame = serde_json::from_str(trimmed).with_context(|| {
                format!("parsing frame at {}:{}", self.path.display(), self.line_no)
            })?;

            // The time reference must be non-decreasing; clamp regressions
            // rather than letting a bad timestamp re-open closed windows.
            if frame.timestamp_ms < self.last_timestamp_ms {
                warn!(
                    "Non-monotonic timestamp at {}:{} ({:.1} < {:.1}), clamping",
                    self.path.display(),
                    self.line_no,
                    frame.timestamp_ms,
                    self.last_timestamp_ms
                );
                frame.timestamp_ms = self.last_timestamp_ms;
            }
            self.last_timestamp_ms = frame.timestamp_ms;

            return Ok(Some(frame));
        }
    }

    fn frame_width(&self) -> u32 {
        self.width
    }

    fn frame_height(&self) -> u32 {
        self.height
    }
}
