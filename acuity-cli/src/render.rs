//! Landolt C raster.
//!
//! Outer diameter equals the image side. Stroke and gap are both a fifth of
//! the diameter. At rotation 0 the gap opens to the right; rotations turn it
//! clockwise on screen.

use acuity_engine::Rotation;
use image::{ImageBuffer, Rgb};

/// Largest optotype written to an image file, in pixels per side.
pub const MAX_IMAGE_PX: u32 = 4096;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

pub fn generate(size: u32, rotation: Rotation) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let mut img = ImageBuffer::from_pixel(size, size, BACKGROUND);
    if size == 0 {
        return img;
    }

    let center = size as f64 / 2.0;
    let outer = center;
    let stroke = size as f64 / 5.0;
    let inner = outer - stroke;
    let half_gap = stroke / 2.0;
    let (sin, cos) = rotation.radians().sin_cos();

    for y in 0..size {
        for x in 0..size {
            let dx = x as f64 + 0.5 - center;
            let dy = y as f64 + 0.5 - center;
            let r = dx.hypot(dy);
            if r < inner || r > outer {
                continue;
            }

            // Undo the rotation so the gap test is always against +x.
            let along = dx * cos + dy * sin;
            let across = -dx * sin + dy * cos;
            if along > 0.0 && across.abs() < half_gap {
                continue;
            }

            img.put_pixel(x, y, INK);
        }
    }

    img
}

/// Screen direction the gap faces for a rotation.
pub fn gap_direction(rotation: Rotation) -> &'static str {
    match rotation.degrees() {
        0 => "right",
        45 => "lower right",
        90 => "down",
        135 => "lower left",
        180 => "left",
        225 => "upper left",
        270 => "up",
        _ => "upper right",
    }
}

/// Text rendering, two characters per pixel to keep the ring round.
pub fn ascii_art(cells: u32, rotation: Rotation) -> Vec<String> {
    let img = generate(cells, rotation);
    img.rows()
        .map(|row| {
            row.map(|px| if *px == INK { "██" } else { "  " })
                .collect::<String>()
        })
        .collect()
}
