//! Viewing-distance estimate from the apparent face area.
//!
//! The larger the face in the frame, the closer the person is: the raw
//! estimate is `calibration_factor / (width * height)`. Raw values are
//! exponentially smoothed, and the estimate is accepted once it has stayed
//! inside the target band, nearly unchanged, for a run of consecutive frames.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bounding box of a detected face, in video pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub width: f64,
    pub height: f64,
}

impl FaceBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Face area (px²) times distance (mm)
    pub calibration_factor: f64,
    /// Weight of the previous smoothed value
    pub smoothing_weight: f64,
    /// Closest accepted distance in whole centimeters
    pub min_distance_cm: i64,
    /// Farthest accepted distance in whole centimeters
    pub max_distance_cm: i64,
    /// Frame-to-frame change (mm) still counted as stable
    pub stability_tolerance_mm: f64,
    /// Consecutive stable frames needed to accept the estimate
    pub required_stable_frames: u32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            calibration_factor: 25000.0,
            smoothing_weight: 0.7,
            min_distance_cm: 30,
            max_distance_cm: 40,
            stability_tolerance_mm: 20.0,
            required_stable_frames: 30,
        }
    }
}

/// Position of the user relative to the accepted band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceStatus {
    TooClose,
    TooFar,
    Good,
}

/// Result of feeding one detection into the estimator.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorUpdate {
    /// No usable face in the frame; stability progress was reset
    NoFace,
    /// A distance was estimated but is not yet accepted
    Measuring {
        distance_mm: f64,
        status: DistanceStatus,
        stable_frames: u32,
        required_frames: u32,
    },
    /// The estimate held steady long enough
    Stable { distance_mm: f64 },
}

impl EstimatorUpdate {
    /// Primary guidance line for the user.
    pub fn message(&self) -> &'static str {
        match self {
            EstimatorUpdate::NoFace => "No face detected",
            EstimatorUpdate::Measuring { status, .. } => match status {
                DistanceStatus::TooClose => "Move back (too close)",
                DistanceStatus::TooFar => "Move closer (too far)",
                DistanceStatus::Good => "Good distance!",
            },
            EstimatorUpdate::Stable { .. } => "Calibration Complete!",
        }
    }

    /// Secondary guidance line.
    pub fn hint(&self) -> String {
        match self {
            EstimatorUpdate::NoFace => {
                "Please ensure your face is completely visible and centered".to_string()
            }
            EstimatorUpdate::Measuring {
                status: DistanceStatus::Good,
                stable_frames,
                ..
            } => format!("Hold position{}", ".".repeat((*stable_frames / 6) as usize)),
            EstimatorUpdate::Measuring { .. } => "Please adjust to 30-40cm from screen".to_string(),
            EstimatorUpdate::Stable { .. } => {
                "Your screen is now calibrated for accurate testing.".to_string()
            }
        }
    }

    /// Rounded distance in centimeters, when one is known.
    pub fn distance_cm(&self) -> Option<i64> {
        match self {
            EstimatorUpdate::NoFace => None,
            EstimatorUpdate::Measuring { distance_mm, .. }
            | EstimatorUpdate::Stable { distance_mm } => Some(mm_to_cm(*distance_mm)),
        }
    }

    /// Hold-still progress in percent, capped at 100.
    pub fn progress_percent(&self) -> u32 {
        match self {
            EstimatorUpdate::NoFace => 0,
            EstimatorUpdate::Measuring {
                stable_frames,
                required_frames,
                ..
            } => {
                let pct = (f64::from(*stable_frames) / f64::from(*required_frames).max(1.0)
                    * 100.0)
                    .round() as u32;
                pct.min(100)
            }
            EstimatorUpdate::Stable { .. } => 100,
        }
    }
}

fn mm_to_cm(distance_mm: f64) -> i64 {
    (distance_mm / 10.0).round() as i64
}

/// Smoothing and stability filter over per-frame face detections.
#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    config: EstimatorConfig,
    last_distance_mm: Option<f64>,
    stable_frames: u32,
}

impl DistanceEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            last_distance_mm: None,
            stable_frames: 0,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Most recent smoothed distance.
    pub fn distance_mm(&self) -> Option<f64> {
        self.last_distance_mm
    }

    pub fn stable_frames(&self) -> u32 {
        self.stable_frames
    }

    pub fn reset(&mut self) {
        self.last_distance_mm = None;
        self.stable_frames = 0;
    }

    /// Unsmoothed distance for a face box; None for an empty box.
    pub fn raw_distance_mm(&self, face: &FaceBox) -> Option<f64> {
        let area = face.area();
        if !area.is_finite() || area <= 0.0 {
            return None;
        }
        Some((self.config.calibration_factor / area).round())
    }

    fn classify(&self, distance_mm: f64) -> DistanceStatus {
        let cm = mm_to_cm(distance_mm);
        if cm < self.config.min_distance_cm {
            DistanceStatus::TooClose
        } else if cm > self.config.max_distance_cm {
            DistanceStatus::TooFar
        } else {
            DistanceStatus::Good
        }
    }

    /// Feed the detection result of one frame.
    pub fn process(&mut self, face: Option<FaceBox>) -> EstimatorUpdate {
        let Some(raw) = face.and_then(|f| self.raw_distance_mm(&f)) else {
            self.reset();
            return EstimatorUpdate::NoFace;
        };

        // A zero estimate (oversized face box) counts as no previous value.
        let previous = self.last_distance_mm.filter(|last| *last > 0.0);

        let weight = self.config.smoothing_weight;
        let distance = match previous {
            Some(last) => (weight * last + (1.0 - weight) * raw).round(),
            None => raw,
        };

        let status = self.classify(distance);
        if status == DistanceStatus::Good {
            let steady = previous
                .is_some_and(|last| (distance - last).abs() < self.config.stability_tolerance_mm);
            if steady {
                self.stable_frames += 1;
                debug!(
                    "Distance {distance} mm steady for {}/{} frames",
                    self.stable_frames, self.config.required_stable_frames
                );
                if self.stable_frames >= self.config.required_stable_frames {
                    return EstimatorUpdate::Stable {
                        distance_mm: distance,
                    };
                }
            } else {
                self.stable_frames = 0;
            }
        }

        self.last_distance_mm = Some(distance);

        EstimatorUpdate::Measuring {
            distance_mm: distance,
            status,
            stable_frames: self.stable_frames,
            required_frames: self.config.required_stable_frames,
        }
    }
}

impl Default for DistanceEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}
