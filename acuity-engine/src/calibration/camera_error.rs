use thiserror::Error;

/// Failure to get a usable camera stream or detection model.
///
/// Each variant carries the text shown to the user together with a retry
/// affordance; none of them are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera access was denied")]
    PermissionDenied,

    #[error("no camera detected")]
    NoDevice,

    #[error("camera is in use by another application")]
    DeviceBusy,

    #[error("failed to load face detection models: {0}")]
    ModelLoad(String),

    #[error("video loading timeout")]
    VideoTimeout,

    #[error("{0}")]
    Other(String),
}

impl CameraError {
    /// Classify a `getUserMedia` failure by its DOMException name.
    pub fn from_dom_error(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" => CameraError::PermissionDenied,
            "NotFoundError" => CameraError::NoDevice,
            "NotReadableError" => CameraError::DeviceBusy,
            _ => CameraError::Other(message.to_string()),
        }
    }

    /// Headline shown in the error panel.
    pub fn message(&self) -> String {
        match self {
            CameraError::PermissionDenied => "Camera access was denied".to_string(),
            CameraError::NoDevice => "No camera detected".to_string(),
            CameraError::DeviceBusy => "Camera is in use by another application".to_string(),
            CameraError::ModelLoad(_) => "Failed to load face detection models".to_string(),
            CameraError::VideoTimeout => "Video loading timeout".to_string(),
            CameraError::Other(message) if message.is_empty() => {
                "An unexpected error occurred".to_string()
            }
            CameraError::Other(message) => message.clone(),
        }
    }

    /// What the user should do before retrying.
    pub fn instructions(&self) -> &'static str {
        match self {
            CameraError::PermissionDenied => {
                "Please allow camera access in your browser settings and try again."
            }
            CameraError::NoDevice => {
                "Please ensure your device has a working camera and try again."
            }
            CameraError::DeviceBusy => {
                "Please close other applications that might be using your camera and try again."
            }
            _ => "Please check your camera and browser settings, then try again.",
        }
    }
}
