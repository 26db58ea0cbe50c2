//! Shared downscale transform for batch-encoded output.

use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Resample `image` to exactly `width` × `height` with high-quality
/// interpolation.
///
/// Pure and order-independent; returns `None` for a degenerate target,
/// which callers treat as a dropped frame.
pub fn downscale(image: &RgbaImage, width: u32, height: u32) -> Option<RgbaImage> {
    if width == 0 || height == 0 {
        return None;
    }
    Some(imageops::resize(image, width, height, FilterType::Lanczos3))
}

/// Target size for capping `width` × `height` at `max_width`, preserving
/// aspect ratio (rounded down).
pub fn capped_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scale = max_width as f64 / width as f64;
    (max_width, (height as f64 * scale) as u32)
}
