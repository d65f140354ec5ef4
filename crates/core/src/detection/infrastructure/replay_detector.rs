use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::detection::domain::detector::{Detector, RawDetection};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("failed to read detections: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid detection record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One line of a recorded detection file.
#[derive(Deserialize)]
struct FrameRecord {
    frame: usize,
    #[serde(default)]
    detections: Vec<RawDetection>,
}

/// Replays detections recorded per frame index.
///
/// The input format is JSON lines, one record per frame:
/// `{"frame": 12, "detections": [{"class": "dog", "score": 0.8, "bbox": [x, y, w, h]}]}`.
/// Frames without a record yield no detections.
pub struct ReplayDetector {
    recorded: HashMap<usize, Vec<RawDetection>>,
}

impl ReplayDetector {
    pub fn new(recorded: HashMap<usize, Vec<RawDetection>>) -> Self {
        Self { recorded }
    }

    pub fn from_path(path: &Path) -> Result<Self, ReplayError> {
        Self::from_reader(File::open(path)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, ReplayError> {
        let mut recorded = HashMap::new();
        for (i, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: FrameRecord =
                serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
                    line: i + 1,
                    source,
                })?;
            recorded
                .entry(record.frame)
                .or_insert_with(Vec::new)
                .extend(record.detections);
        }
        Ok(Self::new(recorded))
    }

    pub fn frame_count(&self) -> usize {
        self.recorded.len()
    }
}

impl Detector for ReplayDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        Ok(self.recorded.get(&frame.index()).cloned().unwrap_or_default())
    }
}
