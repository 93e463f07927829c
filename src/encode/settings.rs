use serde::{Deserialize, Serialize};

use crate::capture::ChannelOrder;
use crate::error::EncodeError;

/// Palette colours available to a GIF frame
pub const MAX_PALETTE_COLORS: usize = 256;

/// How hard the encoder works on colour fidelity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

/// Where a frame's palette comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteStrategy {
    /// One palette built from sample frames, reused for every frame
    Shared,
    /// A palette of its own for every frame
    PerFrame,
}

/// Knobs a [`Quality`] level expands to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPolicy {
    pub strategy: PaletteStrategy,
    pub refinement_iterations: usize,
    pub max_colors: usize,
}

impl Quality {
    pub fn policy(self) -> QualityPolicy {
        let (strategy, refinement_iterations) = match self {
            Quality::Low => (PaletteStrategy::Shared, 2),
            Quality::Medium => (PaletteStrategy::Shared, 6),
            Quality::High => (PaletteStrategy::PerFrame, 12),
        };
        QualityPolicy {
            strategy,
            refinement_iterations,
            max_colors: MAX_PALETTE_COLORS,
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Quality::Low),
            "medium" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            other => Err(format!("unknown quality '{other}', expected low, medium or high")),
        }
    }
}

/// Output parameters for one export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    pub frames_per_second: u32,
    pub quality: Quality,
    /// Channel order the incoming frames are expected to carry
    pub source_channel_order: ChannelOrder,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            frames_per_second: 15,
            quality: Quality::Medium,
            source_channel_order: ChannelOrder::Rgb,
        }
    }
}

impl EncodingSettings {
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.frames_per_second == 0 {
            return Err(EncodeError::InvalidFps);
        }
        Ok(())
    }

    /// Display time of every frame, `round(1000 / fps)` milliseconds
    pub fn frame_duration_ms(&self) -> u32 {
        let fps = self.frames_per_second.max(1);
        (1000 + fps / 2) / fps
    }

    /// The same duration in the GIF's 10 ms units
    pub fn frame_delay_centis(&self) -> u16 {
        ((self.frame_duration_ms() + 5) / 10).min(u32::from(u16::MAX)) as u16
    }
}
