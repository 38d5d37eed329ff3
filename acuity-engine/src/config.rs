use serde::{Deserialize, Serialize};

/// Number of acuity levels; level 1 is the largest optotype, level 17 the smallest.
pub const LEVEL_COUNT: u8 = 17;

/// Rules of the adaptive search over levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    /// Incorrect answers that end an eye's session
    pub max_incorrect: u8,
    /// Highest level (inclusive) at which a correct answer skips ahead by `coarse_step`
    pub coarse_step_max_level: u8,
    /// Index advance after a correct answer in the easy range
    pub coarse_step: usize,
    /// Index advance after a correct answer near threshold
    pub fine_step: usize,
    /// Optotype sizing constants
    pub sizing: SizingConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_incorrect: 3,
            coarse_step_max_level: 10,
            coarse_step: 2,
            fine_step: 1,
            sizing: SizingConfig::default(),
        }
    }
}

impl TestConfig {
    /// Index advance after a correct answer at `level`.
    pub fn step_after_correct(&self, level: u8) -> usize {
        if level <= self.coarse_step_max_level {
            self.coarse_step
        } else {
            self.fine_step
        }
    }
}

/// Geometry used to turn an acuity level into an on-screen size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Optotype size in mm for level 17 at the reference distance
    pub base_size_mm: f64,
    /// Size ratio between adjacent levels (10^(1/10))
    pub level_ratio: f64,
    /// Distance the test is designed to be taken at, in mm
    pub viewing_distance_mm: f64,
    /// Distance the chart sizes are specified for, in mm
    pub reference_distance_mm: f64,
    /// Smaller screen side below which optotypes are scaled down, in mm
    pub reference_screen_mm: f64,
    /// CSS pixels per inch at a device pixel ratio of 1
    pub css_dpi: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            base_size_mm: 8.73,
            level_ratio: 1.2589,
            viewing_distance_mm: 350.0,
            reference_distance_mm: 4000.0,
            reference_screen_mm: 400.0,
            css_dpi: 96.0,
        }
    }
}

/// Fixed delays of the interactive flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Fade-out of the cover-eye prompt before the right eye starts
    pub cover_eye_fade_ms: u64,
    /// Pause after submitting results before leaving the test
    pub redirect_after_save_ms: u64,
    /// Pause after a successful calibration before leaving it
    pub redirect_after_calibration_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cover_eye_fade_ms: 500,
            redirect_after_save_ms: 2200,
            redirect_after_calibration_ms: 2000,
        }
    }
}
