//! Mapping full-colour frames onto palettes

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use super::palette::{Palette, Rgb};
use super::sample;
use super::settings::{PaletteStrategy, QualityPolicy};
use crate::capture::convert;
use crate::capture::Frame;

/// A frame as palette indices
#[derive(Debug, Clone)]
pub struct QuantizedFrame {
    pub width: u32,
    pub height: u32,
    /// One index per pixel, row-major, each below `palette.len()`
    pub indices: Vec<u8>,
    pub palette: Arc<Palette>,
}

/// Every frame of a sequence, quantized with one strategy
#[derive(Debug, Clone)]
pub struct QuantizedAnimation {
    pub width: u32,
    pub height: u32,
    pub strategy: PaletteStrategy,
    /// Set when all frames share one palette
    pub shared_palette: Option<Arc<Palette>>,
    pub frames: Vec<QuantizedFrame>,
}

impl QuantizedAnimation {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Distinct colours across every palette in use
    pub fn color_count(&self) -> usize {
        if let Some(shared) = &self.shared_palette {
            return shared.len();
        }
        let mut seen: Vec<Rgb> = self
            .frames
            .iter()
            .flat_map(|f| f.palette.colors().iter().copied())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

/// Nearest-colour lookup with a per-colour cache
pub struct Remapper<'a> {
    palette: &'a Palette,
    cache: HashMap<Rgb, u8>,
}

impl<'a> Remapper<'a> {
    pub fn new(palette: &'a Palette) -> Self {
        Self {
            palette,
            cache: HashMap::new(),
        }
    }

    pub fn index_of(&mut self, color: Rgb) -> u8 {
        let palette = self.palette;
        *self
            .cache
            .entry(color)
            .or_insert_with(|| palette.nearest(color))
    }

    /// Packed RGB pixels to palette indices
    pub fn remap(&mut self, rgb: &[u8]) -> Vec<u8> {
        rgb.chunks_exact(3)
            .map(|px| self.index_of([px[0], px[1], px[2]]))
            .collect()
    }
}

/// Quantize frames already checked for size and channel order
pub(crate) fn quantize_frames(frames: &[Frame], policy: QualityPolicy) -> QuantizedAnimation {
    let (width, height) = frames.first().map_or((0, 0), Frame::dimensions);
    match policy.strategy {
        PaletteStrategy::Shared => shared(frames, policy, width, height),
        PaletteStrategy::PerFrame => per_frame(frames, policy, width, height),
    }
}

fn shared(frames: &[Frame], policy: QualityPolicy, width: u32, height: u32) -> QuantizedAnimation {
    let samples: Vec<_> = sample::sample_indices(frames.len())
        .into_iter()
        .filter_map(|i| sample::downsample(convert::to_rgb(&frames[i]), width, height))
        .collect();
    let composite = sample::composite(&samples);

    let palette = Arc::new(Palette::build(
        composite.as_raw(),
        policy.max_colors,
        policy.refinement_iterations,
    ));
    debug!(
        "Shared palette of {} colors from {} sample frames",
        palette.len(),
        samples.len()
    );

    let mut remapper = Remapper::new(&palette);
    let quantized = frames
        .iter()
        .map(|frame| QuantizedFrame {
            width,
            height,
            indices: remapper.remap(&convert::to_rgb(frame)),
            palette: Arc::clone(&palette),
        })
        .collect();

    QuantizedAnimation {
        width,
        height,
        strategy: PaletteStrategy::Shared,
        shared_palette: Some(Arc::clone(&palette)),
        frames: quantized,
    }
}

fn per_frame(
    frames: &[Frame],
    policy: QualityPolicy,
    width: u32,
    height: u32,
) -> QuantizedAnimation {
    let quantized: Vec<QuantizedFrame> = frames
        .par_iter()
        .map(|frame| {
            let rgb = convert::to_rgb(frame);
            let palette = Palette::build(&rgb, policy.max_colors, policy.refinement_iterations);
            let indices = Remapper::new(&palette).remap(&rgb);
            QuantizedFrame {
                width,
                height,
                indices,
                palette: Arc::new(palette),
            }
        })
        .collect();

    debug!("Built {} per-frame palettes", quantized.len());

    QuantizedAnimation {
        width,
        height,
        strategy: PaletteStrategy::PerFrame,
        shared_palette: None,
        frames: quantized,
    }
}
