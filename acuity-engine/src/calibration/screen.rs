use serde::{Deserialize, Serialize};

/// Physical size of one CSS pixel at a device pixel ratio of 1 (25.4 mm / 96).
pub const MM_PER_CSS_PIXEL: f64 = 0.264583;

/// Screen geometry as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenParams {
    /// Screen width in device-independent pixels
    pub width_px: f64,
    /// Screen height in device-independent pixels
    pub height_px: f64,
    /// Device pixel ratio
    pub pixel_ratio: f64,
}

impl ScreenParams {
    pub fn new(width_px: f64, height_px: f64, pixel_ratio: f64) -> Self {
        Self {
            width_px,
            height_px,
            pixel_ratio,
        }
    }

    /// Approximate physical width in millimeters.
    pub fn physical_width_mm(&self) -> f64 {
        self.width_px / self.pixel_ratio * MM_PER_CSS_PIXEL
    }

    /// Approximate physical height in millimeters.
    pub fn physical_height_mm(&self) -> f64 {
        self.height_px / self.pixel_ratio * MM_PER_CSS_PIXEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_physical_size() {
        let screen = ScreenParams::new(1920.0, 1080.0, 1.0);
        assert_relative_eq!(screen.physical_width_mm(), 508.0, epsilon = 0.01);
        assert_relative_eq!(screen.physical_height_mm(), 285.75, epsilon = 0.01);
    }

    #[test]
    fn test_pixel_ratio_divides() {
        let screen = ScreenParams::new(2880.0, 1800.0, 2.0);
        assert_relative_eq!(screen.physical_width_mm(), 1440.0 * MM_PER_CSS_PIXEL);
    }
}
