use thiserror::Error;

use crate::calibration::CalibrationError;

/// Errors produced by the acuity test engine.
#[derive(Error, Debug)]
pub enum AcuityError {
    /// Click target did not name one of the eight gap positions.
    #[error("invalid answer {0:?}: expected a digit from 1 to 8")]
    InvalidAnswer(String),

    /// The calibration record is missing or unusable.
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}
