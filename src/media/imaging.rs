// src/media/imaging.rs
//! Fit an arbitrary image into the output frame, letterboxed on a background
//! that contrasts with its content.

use crate::error::StepError;
use crate::types::AspectRatio;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Minimum padding around memes and tweet screenshots.
pub const DEFAULT_PADDING: f64 = 0.05;

/// Black for bright images, white for dark ones.
pub fn contrasting_color(image: &DynamicImage) -> Rgb<u8> {
    let rgb = image.to_rgb8();
    let pixels = (rgb.width() as u64 * rgb.height() as u64).max(1);
    let sum: u64 = rgb
        .pixels()
        .map(|p| p.0[0] as u64 + p.0[1] as u64 + p.0[2] as u64)
        .sum();
    let brightness = sum as f64 / (pixels as f64 * 3.0);
    if brightness > 127.0 {
        Rgb([0, 0, 0])
    } else {
        Rgb([255, 255, 255])
    }
}

/// Size of the image once scaled to fit `target` with `padding` on the
/// constrained axis.
pub fn fitted_size(source: (u32, u32), target: (u32, u32), padding: f64) -> (u32, u32) {
    let (width, height) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let image_ratio = width / height;
    let target_ratio = target.0 as f64 / target.1 as f64;
    let scale = 1.0 - 2.0 * padding;

    let (new_width, new_height) = if image_ratio > target_ratio {
        let w = (target.0 as f64 * scale).floor();
        (w, (w / image_ratio).floor())
    } else {
        let h = (target.1 as f64 * scale).floor();
        ((h * image_ratio).floor(), h)
    };
    ((new_width as u32).max(1), (new_height as u32).max(1))
}

pub fn resize_and_pad(image: &DynamicImage, aspect_ratio: AspectRatio, padding: f64) -> RgbImage {
    let target = aspect_ratio.target_resolution();
    let (new_width, new_height) = fitted_size((image.width(), image.height()), target, padding);
    let resized = image
        .resize_exact(new_width, new_height, FilterType::Lanczos3)
        .to_rgb8();

    let mut canvas = RgbImage::from_pixel(target.0, target.1, contrasting_color(image));
    let x = (target.0.saturating_sub(new_width) / 2) as i64;
    let y = (target.1.saturating_sub(new_height) / 2) as i64;
    imageops::overlay(&mut canvas, &resized, x, y);
    canvas
}

/// Decode `bytes`, normalize, and write a PNG to `output`. CPU bound.
pub fn normalize_to_file(
    bytes: &[u8],
    aspect_ratio: AspectRatio,
    padding: f64,
    output: &Path,
) -> Result<(), StepError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| StepError::permanent("image", format!("can't decode image: {}", e)))?;
    let normalized = resize_and_pad(&decoded, aspect_ratio, padding);

    let mut encoded = Cursor::new(Vec::new());
    normalized
        .write_to(&mut encoded, ImageFormat::Png)
        .map_err(|e| StepError::permanent("image", format!("can't encode image: {}", e)))?;
    std::fs::write(output, encoded.into_inner())
        .map_err(|e| StepError::io("image", "write normalized image", e))
}
