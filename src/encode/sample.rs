//! Representative frames for the shared palette

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Upper bound on frames feeding the shared palette
pub const MAX_SAMPLE_FRAMES: usize = 10;

/// Linear shrink applied to each sample
pub const DOWNSAMPLE_FACTOR: u32 = 4;

/// Evenly spaced frame indices, stride `max(1, count / 10)`
pub fn sample_indices(count: usize) -> Vec<usize> {
    let stride = (count / MAX_SAMPLE_FRAMES).max(1);
    (0..count).step_by(stride).take(MAX_SAMPLE_FRAMES).collect()
}

/// Shrink packed RGB pixels by [`DOWNSAMPLE_FACTOR`], at least 1x1.
///
/// Nearest-neighbour keeps real pixel colours; blending would invent shades
/// that never appear in the recording.
pub fn downsample(rgb: Vec<u8>, width: u32, height: u32) -> Option<RgbImage> {
    let image = RgbImage::from_raw(width, height, rgb)?;
    let target_width = (width / DOWNSAMPLE_FACTOR).max(1);
    let target_height = (height / DOWNSAMPLE_FACTOR).max(1);
    if (target_width, target_height) == (width, height) {
        return Some(image);
    }
    Some(imageops::resize(
        &image,
        target_width,
        target_height,
        FilterType::Nearest,
    ))
}

/// Lay the samples side by side in one row
pub fn composite(samples: &[RgbImage]) -> RgbImage {
    let width: u32 = samples.iter().map(|s| s.width()).sum();
    let height = samples.iter().map(|s| s.height()).max().unwrap_or(0);
    let mut canvas = RgbImage::new(width, height);

    let mut x = 0i64;
    for sample in samples {
        imageops::replace(&mut canvas, sample, x, 0);
        x += i64::from(sample.width());
    }
    canvas
}
