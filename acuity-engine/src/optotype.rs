//! On-screen size of the ring optotype for a given level.
//!
//! Level 17 is specified as 8.73 mm at 4 m, each easier level is larger by
//! `10^(1/10)`. The chart is shrunk to the 35 cm viewing distance, scaled by
//! the measured distance and the shorter screen side, and converted to
//! device pixels.

use crate::calibration::Calibration;
use crate::config::{SizingConfig, LEVEL_COUNT};

const MM_PER_INCH: f64 = 25.4;

/// Physical optotype size in millimeters at the designed viewing distance.
pub fn optotype_size_mm(level: u8, sizing: &SizingConfig) -> f64 {
    let steps = i32::from(LEVEL_COUNT) - i32::from(level);
    let at_reference = sizing.base_size_mm * sizing.level_ratio.powi(steps);
    at_reference * sizing.viewing_distance_mm / sizing.reference_distance_mm
}

/// Device pixels per millimeter for a device pixel ratio.
pub fn pixels_per_mm(pixel_ratio: f64, sizing: &SizingConfig) -> f64 {
    pixel_ratio * sizing.css_dpi / MM_PER_INCH
}

/// Rendered width (and height) of the optotype in pixels, at least 1.
pub fn optotype_size_px(level: u8, calibration: &Calibration, sizing: &SizingConfig) -> u32 {
    let distance_adjustment = calibration.measured_distance_mm() / sizing.viewing_distance_mm;
    let screen_factor = calibration.screen_min_mm() / sizing.reference_screen_mm;

    let px = optotype_size_mm(level, sizing)
        * pixels_per_mm(calibration.pixel_ratio(), sizing)
        * distance_adjustment
        * screen_factor;

    // Validated calibrations keep this finite and positive.
    (px.round() as u32).max(1)
}

/// `(level, size_px)` for every level, largest first.
pub fn size_table(calibration: &Calibration, sizing: &SizingConfig) -> Vec<(u8, u32)> {
    (1..=LEVEL_COUNT)
        .map(|level| (level, optotype_size_px(level, calibration, sizing)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use acuity_shared::CalibrationRecord;
    use approx::assert_relative_eq;

    fn calibration(measured: f64, width: f64, height: f64, ratio: f64) -> Calibration {
        Calibration::new(CalibrationRecord {
            scaling_factor: measured / 400.0,
            target_distance: 400.0,
            measured_distance: measured,
            screen_width: width,
            screen_height: height,
            pixel_density: ratio,
            calibration_date: "2024-11-02T10:15:00.000Z".to_string(),
        })
        .unwrap()
    }

    fn laptop() -> Calibration {
        calibration(350.0, 508.0, 285.75, 1.0)
    }

    #[test]
    fn test_size_mm_progression() {
        let sizing = SizingConfig::default();
        assert_relative_eq!(
            optotype_size_mm(17, &sizing),
            8.73 * 0.0875,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            optotype_size_mm(7, &sizing) / optotype_size_mm(17, &sizing),
            1.2589f64.powi(10),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_known_size() {
        // 8.73 * 1.2589^16 * 0.0875 * (96 / 25.4) * 1.0 * (400 / 400)
        let cal = calibration(350.0, 400.0, 400.0, 1.0);
        let expected = (8.73 * 1.2589f64.powi(16) * 0.0875 * 96.0 / 25.4).round() as u32;
        assert_eq!(optotype_size_px(1, &cal, &SizingConfig::default()), expected);
        assert_eq!(expected, 115);
    }

    #[test]
    fn test_sizes_positive_and_non_increasing() {
        let sizing = SizingConfig::default();
        for cal in [
            laptop(),
            calibration(300.0, 150.0, 70.0, 3.0),
            calibration(400.0, 600.0, 340.0, 1.25),
            calibration(50.0, 20.0, 20.0, 0.5),
        ] {
            let table = size_table(&cal, &sizing);
            assert_eq!(table.len(), 17);
            assert!(table.iter().all(|&(_, px)| px >= 1));
            for pair in table.windows(2) {
                assert!(pair[0].1 >= pair[1].1, "{pair:?}");
            }
        }
    }

    #[test]
    fn test_strictly_decreasing_on_dense_display() {
        let cal = calibration(400.0, 600.0, 400.0, 2.0);
        let table = size_table(&cal, &SizingConfig::default());
        for pair in table.windows(2) {
            assert!(pair[0].1 > pair[1].1, "{pair:?}");
        }
    }

    #[test]
    fn test_farther_viewer_gets_larger_optotype() {
        let sizing = SizingConfig::default();
        let near = calibration(300.0, 508.0, 285.75, 1.0);
        let far = calibration(400.0, 508.0, 285.75, 1.0);
        assert!(optotype_size_px(1, &far, &sizing) > optotype_size_px(1, &near, &sizing));
    }

    #[test]
    fn test_smaller_screen_gets_smaller_optotype() {
        let sizing = SizingConfig::default();
        let small = calibration(350.0, 150.0, 70.0, 1.0);
        assert!(optotype_size_px(1, &small, &sizing) < optotype_size_px(1, &laptop(), &sizing));
    }

    #[test]
    fn test_tiny_size_clamped_to_one_pixel() {
        let cal = calibration(10.0, 5.0, 5.0, 0.1);
        assert_eq!(optotype_size_px(17, &cal, &SizingConfig::default()), 1);
    }
}
