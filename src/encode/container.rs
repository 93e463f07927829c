//! GIF byte stream assembly

use std::borrow::Cow;

use gif::{DisposalMethod, Encoder, Repeat};
use tracing::debug;

use super::quantize::QuantizedAnimation;
use super::settings::PaletteStrategy;
use crate::error::EncodeError;

/// Serialize quantized frames into a complete GIF.
///
/// More than one frame gives a forever-looping animation with `delay_centis`
/// per frame; a single frame is written as a still image.
pub fn write_gif(anim: &QuantizedAnimation, delay_centis: u16) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = gif_dimensions(anim.width, anim.height)?;
    let animated = anim.len() > 1;

    let global_table = anim
        .shared_palette
        .as_ref()
        .map(|p| p.to_table())
        .unwrap_or_default();

    let mut encoder = Encoder::new(Vec::new(), width, height, &global_table)?;
    if animated {
        encoder.set_repeat(Repeat::Infinite)?;
    }

    let dispose = match anim.strategy {
        // Reused palettes ghost unless the canvas is cleared between frames
        PaletteStrategy::Shared => DisposalMethod::Background,
        PaletteStrategy::PerFrame => DisposalMethod::Keep,
    };

    for quantized in &anim.frames {
        let mut frame = gif::Frame::default();
        frame.width = width;
        frame.height = height;
        frame.buffer = Cow::Borrowed(quantized.indices.as_slice());
        frame.delay = if animated { delay_centis } else { 0 };
        frame.dispose = dispose;
        if anim.shared_palette.is_none() {
            frame.palette = Some(quantized.palette.to_table());
        }
        encoder.write_frame(&frame)?;
    }

    let bytes = encoder.into_inner()?;
    debug!("Wrote {} frames, {} bytes", anim.len(), bytes.len());
    Ok(bytes)
}

pub(crate) fn gif_dimensions(width: u32, height: u32) -> Result<(u16, u16), EncodeError> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(EncodeError::FrameTooLarge { width, height }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;
    use crate::encode::quantize::quantize_frames;
    use crate::encode::settings::Quality;

    fn decode(bytes: &[u8]) -> (Option<Vec<u8>>, Repeat, Vec<(u16, DisposalMethod, bool)>) {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);
        let mut decoder = options.read_info(bytes).unwrap();
        let global = decoder.global_palette().map(|p| p.to_vec());
        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            frames.push((frame.delay, frame.dispose, frame.palette.is_some()));
        }
        (global, decoder.repeat(), frames)
    }

    #[test]
    fn test_shared_animation_layout() {
        let frames = vec![
            Frame::solid(20, 20, [255, 0, 0]),
            Frame::solid(20, 20, [0, 0, 255]),
        ];
        let anim = quantize_frames(&frames, Quality::Medium.policy());
        let bytes = write_gif(&anim, 7).unwrap();

        let (global, repeat, decoded) = decode(&bytes);
        assert!(global.is_some());
        assert_eq!(repeat, Repeat::Infinite);
        assert_eq!(decoded.len(), 2);
        for (delay, dispose, local_palette) in decoded {
            assert_eq!(delay, 7);
            assert_eq!(dispose, DisposalMethod::Background);
            assert!(!local_palette);
        }
    }

    #[test]
    fn test_per_frame_animation_layout() {
        let frames = vec![
            Frame::solid(20, 20, [255, 0, 0]),
            Frame::solid(20, 20, [0, 0, 255]),
            Frame::solid(20, 20, [0, 255, 0]),
        ];
        let anim = quantize_frames(&frames, Quality::High.policy());
        let bytes = write_gif(&anim, 10).unwrap();

        let (global, repeat, decoded) = decode(&bytes);
        assert!(global.is_none());
        assert_eq!(repeat, Repeat::Infinite);
        assert_eq!(decoded.len(), 3);
        assert!(decoded
            .iter()
            .all(|(delay, dispose, local)| *delay == 10 && *dispose == DisposalMethod::Keep && *local));
    }

    #[test]
    fn test_single_frame_is_still_image() {
        let frames = vec![Frame::solid(20, 20, [9, 9, 9])];
        let anim = quantize_frames(&frames, Quality::Medium.policy());
        let bytes = write_gif(&anim, 7).unwrap();

        let (_, repeat, decoded) = decode(&bytes);
        assert_ne!(repeat, Repeat::Infinite);
        assert_eq!(decoded, vec![(0, DisposalMethod::Background, false)]);
        // No NETSCAPE looping extension
        assert!(!bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        assert!(matches!(
            gif_dimensions(70_000, 10),
            Err(EncodeError::FrameTooLarge { .. })
        ));
        assert_eq!(gif_dimensions(640, 480).unwrap(), (640, 480));
    }
}
