//! Shared types for the acuity engine and its frontends.
//!
//! This crate contains lightweight serialization types that can be used
//! by both native binaries (acuity-cli) and a WASM frontend. All types here
//! must be WASM-compatible (no threading, no C bindings).

pub mod http_client;
mod results_client;

pub use http_client::{HttpClient, HttpClientError};
pub use results_client::{ResultsClient, ResultsError, SAVE_RESULTS_PATH};

use serde::{Deserialize, Serialize};

/// Storage key under which the calibration record is persisted.
pub const CALIBRATION_STORAGE_KEY: &str = "screenCalibration";

/// Screen and viewing-distance calibration produced by the webcam estimator.
///
/// Serialized with camelCase keys so records written by the browser flow
/// and by native tools are interchangeable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    /// measured_distance / target_distance
    pub scaling_factor: f64,
    /// Reference distance the user is asked to hold, in millimeters
    pub target_distance: f64,
    /// Stabilized webcam-estimated viewing distance in millimeters
    pub measured_distance: f64,
    /// Physical screen width in millimeters
    pub screen_width: f64,
    /// Physical screen height in millimeters
    pub screen_height: f64,
    /// Device pixel ratio at calibration time
    pub pixel_density: f64,
    /// RFC 3339 timestamp of the calibration
    pub calibration_date: String,
}

/// Body posted to the results endpoint once both eyes are tested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveResultRequest {
    pub left_eye_level: u8,
    pub right_eye_level: u8,
    /// Incorrect answers of the session that finished last (the right eye)
    pub incorrect_answers: u8,
    pub right_eye_incorrect: u8,
    pub left_eye_incorrect: u8,
    /// Feedback band message, without the per-eye level suffix
    #[serde(rename = "feedBack")]
    pub feedback: String,
}

/// Response returned by the results endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveResultResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_calibration_record_uses_browser_keys() {
        let json = r#"{
            "scalingFactor": 0.9,
            "targetDistance": 400,
            "measuredDistance": 360,
            "screenWidth": 344.2,
            "screenHeight": 193.5,
            "pixelDensity": 2,
            "calibrationDate": "2024-11-02T10:15:00.000Z"
        }"#;

        let record: CalibrationRecord = serde_json::from_str(json).unwrap();
        assert_abs_diff_eq!(record.measured_distance, 360.0);
        assert_abs_diff_eq!(record.screen_height, 193.5);
        assert_abs_diff_eq!(record.pixel_density, 2.0);
        assert_eq!(record.calibration_date, "2024-11-02T10:15:00.000Z");
    }

    #[test]
    fn test_save_request_field_names() {
        let request = SaveResultRequest {
            left_eye_level: 9,
            right_eye_level: 15,
            incorrect_answers: 3,
            right_eye_incorrect: 3,
            left_eye_incorrect: 3,
            feedback: "ok".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();
        let object = value.as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "feedBack",
                "incorrectAnswers",
                "leftEyeIncorrect",
                "leftEyeLevel",
                "rightEyeIncorrect",
                "rightEyeLevel",
            ]
        );
        assert_eq!(object["leftEyeLevel"], 9);
        assert_eq!(object["feedBack"], "ok");
    }

    #[test]
    fn test_save_response_ignores_extra_fields() {
        let response: SaveResultResponse =
            serde_json::from_str(r#"{"success": false, "message": "db down"}"#).unwrap();
        assert!(!response.success);
    }
}
