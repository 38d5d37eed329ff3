//! Maps the two per-eye levels to a feedback band.

use serde::{Deserialize, Serialize};

use crate::config::LEVEL_COUNT;

/// Feedback bands, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Average level below 5
    Severe,
    /// Average level 5..=10
    Moderate,
    /// Average level 11..=13
    Mild,
    /// Average level above 13
    Good,
}

impl Severity {
    /// Band for a floored average level. Upper bounds are inclusive.
    pub fn from_average(average_level: u8) -> Self {
        if average_level < 5 {
            Severity::Severe
        } else if average_level <= 10 {
            Severity::Moderate
        } else if average_level <= 13 {
            Severity::Mild
        } else {
            Severity::Good
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Severity::Severe => {
                "Your vision seems too low! You should visit an eye doctor immediately."
            }
            Severity::Moderate => {
                "Your vision needs attention. We recommend scheduling a visit to an eye doctor."
            }
            Severity::Mild => "Your vision is okay, but consider an eye checkup for better clarity.",
            Severity::Good => "Great! Your vision seems excellent. Keep maintaining eye health.",
        }
    }

    /// CSS color of the message.
    pub fn color(self) -> &'static str {
        match self {
            Severity::Severe => "#d9534f",
            Severity::Moderate | Severity::Mild => "#f0ad4e",
            Severity::Good => "#5cb85c",
        }
    }
}

/// Classified result for a pair of eye levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionFeedback {
    pub left_level: u8,
    pub right_level: u8,
    /// floor((left + right) / 2)
    pub average_level: u8,
    pub severity: Severity,
}

impl VisionFeedback {
    pub fn message(&self) -> &'static str {
        self.severity.message()
    }

    pub fn color(&self) -> &'static str {
        self.severity.color()
    }

    /// Message followed by the per-eye level lines shown to the user.
    pub fn summary_lines(&self) -> [String; 3] {
        [
            self.message().to_string(),
            format!("Left Eye Level: {}/{LEVEL_COUNT}", self.left_level),
            format!("Right Eye Level: {}/{LEVEL_COUNT}", self.right_level),
        ]
    }
}

pub fn determine_vision_feedback(left_level: u8, right_level: u8) -> VisionFeedback {
    let average_level = ((u16::from(left_level) + u16::from(right_level)) / 2) as u8;
    VisionFeedback {
        left_level,
        right_level,
        average_level,
        severity: Severity::from_average(average_level),
    }
}
