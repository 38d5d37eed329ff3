//! Screen and viewing-distance calibration.
//!
//! The test engine only consumes a [`Calibration`], a record whose numeric
//! fields have been checked at load time. Producing the record is the job of
//! the [`DistanceEstimator`] fed by a webcam face detector, driven frame by
//! frame through [`run_calibration`].

mod camera_error;
mod estimator;
mod run;
mod screen;
mod storage;

pub use camera_error::CameraError;
pub use estimator::{DistanceEstimator, DistanceStatus, EstimatorConfig, EstimatorUpdate, FaceBox};
pub use run::{
    build_record, run_calibration, CalibrationOutcome, FaceDetector, FrameSource,
    TARGET_DISTANCE_MM,
};
pub use screen::{ScreenParams, MM_PER_CSS_PIXEL};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

use acuity_shared::{CalibrationRecord, CALIBRATION_STORAGE_KEY};
use thiserror::Error;
use tracing::{info, warn};

/// Why a calibration record cannot be used.
#[derive(Error, Debug)]
pub enum CalibrationError {
    /// No record stored; the user has to calibrate first.
    #[error("no screen calibration found, run calibration first")]
    NotFound,

    /// Stored value is not a calibration record.
    #[error("calibration record could not be parsed: {0}")]
    Parse(String),

    /// A numeric field is non-finite or not positive.
    #[error("invalid calibration: {field} = {value}")]
    Invalid { field: &'static str, value: f64 },

    #[error("calibration storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// A calibration record whose numeric fields are finite and positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    record: CalibrationRecord,
}

impl Calibration {
    pub fn new(record: CalibrationRecord) -> Result<Self, CalibrationError> {
        validate(&record)?;
        Ok(Self { record })
    }

    pub fn record(&self) -> &CalibrationRecord {
        &self.record
    }

    pub fn into_record(self) -> CalibrationRecord {
        self.record
    }

    pub fn measured_distance_mm(&self) -> f64 {
        self.record.measured_distance
    }

    /// Shorter physical screen side in millimeters.
    pub fn screen_min_mm(&self) -> f64 {
        self.record.screen_width.min(self.record.screen_height)
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.record.pixel_density
    }
}

impl TryFrom<CalibrationRecord> for Calibration {
    type Error = CalibrationError;

    fn try_from(record: CalibrationRecord) -> Result<Self, Self::Error> {
        Self::new(record)
    }
}

/// Farthest plausible viewing distance in millimeters.
pub const MAX_MEASURED_DISTANCE_MM: f64 = 2000.0;
/// Longest plausible physical screen side in millimeters.
pub const MAX_SCREEN_SIDE_MM: f64 = 5000.0;
/// Highest plausible device pixel ratio.
pub const MAX_PIXEL_RATIO: f64 = 8.0;

fn check_positive(field: &'static str, value: f64) -> Result<(), CalibrationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CalibrationError::Invalid { field, value })
    }
}

fn check_range(field: &'static str, value: f64, max: f64) -> Result<(), CalibrationError> {
    check_positive(field, value)?;
    if value <= max {
        Ok(())
    } else {
        Err(CalibrationError::Invalid { field, value })
    }
}

/// Reject records that would produce non-finite, degenerate or absurdly
/// large optotype sizes.
pub fn validate(record: &CalibrationRecord) -> Result<(), CalibrationError> {
    check_range(
        "measuredDistance",
        record.measured_distance,
        MAX_MEASURED_DISTANCE_MM,
    )?;
    check_range("screenWidth", record.screen_width, MAX_SCREEN_SIDE_MM)?;
    check_range("screenHeight", record.screen_height, MAX_SCREEN_SIDE_MM)?;
    check_range("pixelDensity", record.pixel_density, MAX_PIXEL_RATIO)?;
    check_positive("targetDistance", record.target_distance)?;
    check_positive("scalingFactor", record.scaling_factor)?;
    Ok(())
}

/// Read, parse and validate the stored record.
pub fn load_calibration<S: KeyValueStore + ?Sized>(
    store: &S,
) -> Result<Calibration, CalibrationError> {
    let Some(json) = store.get(CALIBRATION_STORAGE_KEY)? else {
        warn!("No calibration record under key {CALIBRATION_STORAGE_KEY}");
        return Err(CalibrationError::NotFound);
    };

    // The browser stores the literal "null" after a cleared calibration.
    let record: Option<CalibrationRecord> =
        serde_json::from_str(&json).map_err(|e| CalibrationError::Parse(e.to_string()))?;
    let record = record.ok_or(CalibrationError::NotFound)?;

    let calibration = Calibration::new(record)?;
    info!(
        "Loaded calibration from {}: distance {:.0} mm, screen {:.1}x{:.1} mm",
        calibration.record().calibration_date,
        calibration.record().measured_distance,
        calibration.record().screen_width,
        calibration.record().screen_height
    );
    Ok(calibration)
}

/// Persist a record under the calibration key.
pub fn save_calibration<S: KeyValueStore + ?Sized>(
    store: &mut S,
    record: &CalibrationRecord,
) -> Result<(), CalibrationError> {
    let json = serde_json::to_string(record).map_err(|e| CalibrationError::Parse(e.to_string()))?;
    store.set(CALIBRATION_STORAGE_KEY, &json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn record() -> CalibrationRecord {
        CalibrationRecord {
            scaling_factor: 0.9,
            target_distance: 400.0,
            measured_distance: 360.0,
            screen_width: 508.0,
            screen_height: 285.75,
            pixel_density: 1.0,
            calibration_date: "2024-11-02T10:15:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_valid_record_accepted() {
        let calibration = Calibration::new(record()).unwrap();
        assert_abs_diff_eq!(calibration.screen_min_mm(), 285.75);
        assert_abs_diff_eq!(calibration.measured_distance_mm(), 360.0);
    }

    #[test]
    fn test_implausible_values_rejected() {
        let mut bad = record();
        bad.measured_distance = 1e9;
        assert!(matches!(
            Calibration::new(bad),
            Err(CalibrationError::Invalid {
                field: "measuredDistance",
                ..
            })
        ));

        let mut bad = record();
        bad.screen_width = 60_000.0;
        assert!(matches!(
            Calibration::new(bad),
            Err(CalibrationError::Invalid {
                field: "screenWidth",
                ..
            })
        ));

        let mut bad = record();
        bad.pixel_density = 100.0;
        assert!(Calibration::new(bad).is_err());

        let mut edge = record();
        edge.measured_distance = MAX_MEASURED_DISTANCE_MM;
        assert!(Calibration::new(edge).is_ok());
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let mut bad = record();
        bad.measured_distance = f64::NAN;
        assert!(matches!(
            Calibration::new(bad),
            Err(CalibrationError::Invalid {
                field: "measuredDistance",
                ..
            })
        ));

        let mut bad = record();
        bad.screen_height = 0.0;
        assert!(matches!(
            Calibration::new(bad),
            Err(CalibrationError::Invalid {
                field: "screenHeight",
                ..
            })
        ));

        let mut bad = record();
        bad.pixel_density = f64::INFINITY;
        assert!(matches!(
            Calibration::new(bad),
            Err(CalibrationError::Invalid {
                field: "pixelDensity",
                ..
            })
        ));
    }

    #[test]
    fn test_load_missing_record() {
        let store = MemoryStore::new();
        assert!(matches!(
            load_calibration(&store),
            Err(CalibrationError::NotFound)
        ));
    }

    #[test]
    fn test_load_null_record() {
        let mut store = MemoryStore::new();
        store.set(CALIBRATION_STORAGE_KEY, "null").unwrap();
        assert!(matches!(
            load_calibration(&store),
            Err(CalibrationError::NotFound)
        ));
    }

    #[test]
    fn test_load_garbage_record() {
        let mut store = MemoryStore::new();
        store.set(CALIBRATION_STORAGE_KEY, "{not json").unwrap();
        assert!(matches!(
            load_calibration(&store),
            Err(CalibrationError::Parse(_))
        ));
    }

    #[test]
    fn test_load_record_with_missing_field() {
        let mut store = MemoryStore::new();
        store
            .set(CALIBRATION_STORAGE_KEY, r#"{"measuredDistance": 350}"#)
            .unwrap();
        assert!(matches!(
            load_calibration(&store),
            Err(CalibrationError::Parse(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::new();
        save_calibration(&mut store, &record()).unwrap();
        let loaded = load_calibration(&store).unwrap();
        assert_eq!(loaded.record(), &record());
    }
}
