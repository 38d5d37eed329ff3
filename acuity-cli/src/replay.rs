//! Recorded face detections replayed as a camera stream.
//!
//! One JSON value per line: `{"width": 120.0, "height": 150.0}` for a face,
//! `null` for a frame without one. Blank lines are skipped.

use std::convert::Infallible;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use acuity_engine::calibration::{CameraError, FaceBox, FaceDetector, FrameSource};
use tracing::info;

pub struct DetectionReplay<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
    frames: usize,
}

impl DetectionReplay<BufReader<File>> {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> DetectionReplay<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            frames: 0,
        }
    }
}

impl<R: BufRead> FrameSource for DetectionReplay<R> {
    type Frame = Option<FaceBox>;

    fn next_frame(&mut self) -> Result<Option<Self::Frame>, CameraError> {
        for line in self.lines.by_ref() {
            self.line_number += 1;
            let line = line.map_err(|e| CameraError::Other(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let face: Option<FaceBox> = serde_json::from_str(&line).map_err(|e| {
                CameraError::Other(format!("line {}: {e}", self.line_number))
            })?;
            self.frames += 1;
            return Ok(Some(face));
        }
        Ok(None)
    }

    fn stop(&mut self) {
        info!("Replay stopped after {} frames", self.frames);
    }
}

/// Detector for frames that already carry their detection.
pub struct RecordedDetector;

impl FaceDetector<Option<FaceBox>> for RecordedDetector {
    type Error = Infallible;

    fn detect_single_face_with_landmarks(
        &mut self,
        frame: &Option<FaceBox>,
    ) -> Result<Option<FaceBox>, Infallible> {
        Ok(*frame)
    }
}
