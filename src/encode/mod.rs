//! Quantized GIF export of captured frame sequences.
//!
//! One encoder covers every quality level: [`Quality`] picks between a
//! shared palette (sampled across the recording) and per-frame palettes,
//! and sets how many k-means rounds refine the median-cut palette.

pub mod container;
pub mod metadata;
pub mod palette;
pub mod quantize;
pub mod sample;
pub mod settings;

use std::path::Path;
use std::time::Instant;

use tracing::{info, instrument};

use crate::capture::FrameSequence;
use crate::error::EncodeError;
use crate::utils;

pub use metadata::{frame_metadata, SequenceMetadata};
pub use palette::{Palette, Rgb};
pub use quantize::{QuantizedAnimation, QuantizedFrame};
pub use settings::{EncodingSettings, PaletteStrategy, Quality, QualityPolicy, MAX_PALETTE_COLORS};

/// Turns a [`FrameSequence`] into a looping, palette-indexed GIF
#[derive(Debug, Clone, Default)]
pub struct AnimationEncoder {
    settings: EncodingSettings,
}

impl AnimationEncoder {
    pub fn new(settings: EncodingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncodingSettings {
        &self.settings
    }

    /// Encode the whole sequence into GIF bytes
    #[instrument(skip_all, fields(frames = frames.len(), quality = ?self.settings.quality))]
    pub fn encode(&self, frames: &FrameSequence) -> Result<Vec<u8>, EncodeError> {
        let start = Instant::now();
        let anim = self.quantize(frames)?;
        let bytes = container::write_gif(&anim, self.settings.frame_delay_centis())?;

        let elapsed = start.elapsed();
        metrics::histogram!("encode_time_ms").record(elapsed.as_secs_f64() * 1000.0);
        info!(
            "Encoded {} frames with {} colors into {} bytes in {:?}",
            anim.len(),
            anim.color_count(),
            bytes.len(),
            elapsed
        );
        Ok(bytes)
    }

    /// Validate and quantize without writing a container
    pub fn quantize(&self, frames: &FrameSequence) -> Result<QuantizedAnimation, EncodeError> {
        self.validate(frames)?;
        Ok(quantize::quantize_frames(
            frames.as_slice(),
            self.settings.quality.policy(),
        ))
    }

    /// Summary of `frames` at this encoder's frame rate
    pub fn frame_metadata(&self, frames: &FrameSequence) -> Option<SequenceMetadata> {
        metadata::frame_metadata(frames, self.settings.frames_per_second)
    }

    /// Encode and write atomically to `path`, returning the file size.
    ///
    /// Nothing is left at `path` unless the whole file was written.
    #[instrument(skip(self, frames), fields(frames = frames.len()))]
    pub fn export(&self, frames: &FrameSequence, path: &Path) -> Result<u64, EncodeError> {
        let bytes = self.encode(frames)?;
        let size = utils::write_atomic(path, &bytes)?;
        info!("Saved {} ({})", path.display(), utils::human_size(size));
        Ok(size)
    }

    fn validate(&self, frames: &FrameSequence) -> Result<(), EncodeError> {
        self.settings.validate()?;

        let first = frames.first().ok_or(EncodeError::EmptySequence)?;
        frames.validate_dimensions()?;
        container::gif_dimensions(first.width(), first.height())?;

        let expected = self.settings.source_channel_order;
        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.format().order() != expected)
        {
            return Err(EncodeError::ChannelOrderMismatch {
                index,
                expected,
                found: frame.format().order(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ChannelOrder, Frame, PixelFormat};

    fn solid_sequence(n: usize, size: u32) -> FrameSequence {
        (0..n).map(|_| Frame::solid(size, size, [200, 10, 10])).collect()
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let err = AnimationEncoder::default()
            .encode(&FrameSequence::new())
            .unwrap_err();
        assert!(matches!(err, EncodeError::EmptySequence));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let frames: FrameSequence = vec![
            Frame::solid(20, 20, [0, 0, 0]),
            Frame::solid(20, 21, [0, 0, 0]),
        ]
        .into();
        let err = AnimationEncoder::default().encode(&frames).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::DimensionMismatch {
                index: 1,
                expected: (20, 20),
                found: (20, 21)
            }
        ));
    }

    #[test]
    fn test_zero_fps_rejected() {
        let encoder = AnimationEncoder::new(EncodingSettings {
            frames_per_second: 0,
            ..Default::default()
        });
        assert!(matches!(
            encoder.encode(&solid_sequence(2, 10)),
            Err(EncodeError::InvalidFps)
        ));
    }

    #[test]
    fn test_channel_order_must_match_tag() {
        let bgr = Frame::new(10, 10, PixelFormat::Bgr24, vec![0u8; 300]).unwrap();
        let frames: FrameSequence = vec![Frame::solid(10, 10, [0, 0, 0]), bgr.clone()].into();
        let err = AnimationEncoder::default().encode(&frames).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::ChannelOrderMismatch {
                index: 1,
                expected: ChannelOrder::Rgb,
                found: ChannelOrder::Bgr
            }
        ));

        let encoder = AnimationEncoder::new(EncodingSettings {
            source_channel_order: ChannelOrder::Bgr,
            ..Default::default()
        });
        let frames: FrameSequence = vec![bgr.clone(), bgr].into();
        assert!(encoder.encode(&frames).is_ok());
    }

    #[test]
    fn test_bgr_input_normalized_before_quantizing() {
        let bgra = Frame::new(10, 10, PixelFormat::Bgra32, [30u8, 20, 10, 255].repeat(100)).unwrap();
        let encoder = AnimationEncoder::new(EncodingSettings {
            source_channel_order: ChannelOrder::Bgr,
            ..Default::default()
        });
        let anim = encoder.quantize(&vec![bgra].into()).unwrap();
        assert_eq!(anim.shared_palette.unwrap().colors(), &[[10, 20, 30]]);
    }

    #[test]
    fn test_uniform_medium_sequence_has_minimal_palette() {
        let frames = solid_sequence(12, 40);
        let anim = AnimationEncoder::default().quantize(&frames).unwrap();
        assert_eq!(anim.strategy, PaletteStrategy::Shared);
        assert_eq!(anim.shared_palette.unwrap().colors(), &[[200, 10, 10]]);
    }

    #[test]
    fn test_metadata_uses_encoder_fps() {
        let encoder = AnimationEncoder::new(EncodingSettings {
            frames_per_second: 10,
            ..Default::default()
        });
        let meta = encoder.frame_metadata(&solid_sequence(25, 10)).unwrap();
        assert_eq!(meta.estimated_duration_seconds, 2.5);
    }

    #[test]
    fn test_every_quality_encodes() {
        let frames: FrameSequence = (0..4u8)
            .map(|i| Frame::solid(16, 16, [i * 60, 255 - i * 60, 128]))
            .collect();
        for quality in [Quality::Low, Quality::Medium, Quality::High] {
            let encoder = AnimationEncoder::new(EncodingSettings {
                quality,
                ..Default::default()
            });
            let bytes = encoder.encode(&frames).unwrap();
            assert_eq!(&bytes[..6], b"GIF89a");
        }
    }
}
