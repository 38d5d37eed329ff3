//! Frame-driven calibration loop.
//!
//! Each cycle is strictly sequential: grab a frame, run the detector, update
//! the estimate, report it, then move on to the next frame. The stream is
//! stopped on every exit path.

use acuity_shared::CalibrationRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use super::camera_error::CameraError;
use super::estimator::{DistanceEstimator, EstimatorUpdate, FaceBox};
use super::screen::ScreenParams;

/// Distance the user is asked to sit at, in millimeters.
pub const TARGET_DISTANCE_MM: f64 = 400.0;

/// Live video stream.
pub trait FrameSource {
    type Frame;

    /// Next frame, or None once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, CameraError>;

    /// Stop every track of the stream. Called exactly once per run.
    fn stop(&mut self);
}

/// Single-face detector with landmarks (e.g. a tiny face detector model).
pub trait FaceDetector<F> {
    type Error: std::fmt::Display;

    fn detect_single_face_with_landmarks(&mut self, frame: &F)
        -> Result<Option<FaceBox>, Self::Error>;
}

/// How a calibration run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    /// Distance stabilized; the record is ready to be persisted
    Completed(CalibrationRecord),
    /// The user cancelled
    Cancelled,
    /// The stream ran out of frames first
    StreamEnded,
}

struct StopOnDrop<'a, S: FrameSource>(&'a mut S);

impl<S: FrameSource> Drop for StopOnDrop<'_, S> {
    fn drop(&mut self) {
        self.0.stop();
        info!("Camera stream stopped");
    }
}

/// Calibration record for an accepted distance.
pub fn build_record(
    distance_mm: f64,
    screen: &ScreenParams,
    date: DateTime<Utc>,
) -> CalibrationRecord {
    CalibrationRecord {
        scaling_factor: distance_mm / TARGET_DISTANCE_MM,
        target_distance: TARGET_DISTANCE_MM,
        measured_distance: distance_mm,
        screen_width: screen.physical_width_mm(),
        screen_height: screen.physical_height_mm(),
        pixel_density: screen.pixel_ratio,
        calibration_date: date.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Run detection over `source` until the estimate is stable, the user
/// cancels, or the stream ends.
///
/// Detector failures on a single frame are logged and the frame is skipped.
/// A failing stream aborts the run with its error.
pub fn run_calibration<S, D, C, U>(
    source: &mut S,
    detector: &mut D,
    estimator: &mut DistanceEstimator,
    screen: &ScreenParams,
    mut is_cancelled: C,
    mut on_update: U,
) -> Result<CalibrationOutcome, CameraError>
where
    S: FrameSource,
    D: FaceDetector<S::Frame>,
    C: FnMut() -> bool,
    U: FnMut(&EstimatorUpdate),
{
    let stream = StopOnDrop(source);
    info!("Starting face detection");

    loop {
        if is_cancelled() {
            info!("Calibration cancelled");
            return Ok(CalibrationOutcome::Cancelled);
        }

        let Some(frame) = stream.0.next_frame()? else {
            warn!("Camera stream ended before the distance stabilized");
            return Ok(CalibrationOutcome::StreamEnded);
        };

        let detection = match detector.detect_single_face_with_landmarks(&frame) {
            Ok(detection) => detection,
            Err(e) => {
                warn!("Error in face detection: {e}");
                continue;
            }
        };

        let update = estimator.process(detection);
        on_update(&update);

        if let EstimatorUpdate::Stable { distance_mm } = update {
            let record = build_record(distance_mm, screen, Utc::now());
            info!(
                "Calibration complete: {:.0} mm (scaling factor {:.3})",
                record.measured_distance, record.scaling_factor
            );
            return Ok(CalibrationOutcome::Completed(record));
        }
    }
}
