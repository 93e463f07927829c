//! Channel-order normalization to the internal RGB layout

use super::frame::{ChannelOrder, Frame, PixelFormat};

/// Tightly packed RGB bytes for any supported layout, alpha dropped
pub fn to_rgb(frame: &Frame) -> Vec<u8> {
    let format = frame.format();
    let data = frame.data();
    match format {
        PixelFormat::Rgb24 => data.to_vec(),
        _ => {
            let channels = format.channels();
            let swap = format.order() == ChannelOrder::Bgr;
            let mut rgb = Vec::with_capacity(data.len() / channels * 3);
            for px in data.chunks_exact(channels) {
                if swap {
                    rgb.extend_from_slice(&[px[2], px[1], px[0]]);
                } else {
                    rgb.extend_from_slice(&px[..3]);
                }
            }
            rgb
        }
    }
}

/// Re-tag a frame as `Rgb24`, converting the pixels if needed
pub fn normalize(frame: Frame) -> Frame {
    if frame.format() == PixelFormat::Rgb24 {
        return frame;
    }

    let rgb = to_rgb(&frame);
    let (width, height) = frame.dimensions();
    let sequence = frame.meta().sequence;
    let timestamp = frame.timestamp();
    // Length is width * height * 3 by construction
    match Frame::new(width, height, PixelFormat::Rgb24, rgb) {
        Ok(converted) => converted.stamped(sequence, timestamp),
        Err(_) => frame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgra_to_rgb() {
        let frame = Frame::new(2, 1, PixelFormat::Bgra32, vec![1, 2, 3, 255, 4, 5, 6, 0]).unwrap();
        assert_eq!(to_rgb(&frame), vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_rgba_drops_alpha() {
        let frame = Frame::new(1, 1, PixelFormat::Rgba32, vec![10, 20, 30, 40]).unwrap();
        assert_eq!(to_rgb(&frame), vec![10, 20, 30]);
    }

    #[test]
    fn test_bgr_swaps() {
        let frame = Frame::new(1, 1, PixelFormat::Bgr24, vec![10, 20, 30]).unwrap();
        assert_eq!(to_rgb(&frame), vec![30, 20, 10]);
    }

    #[test]
    fn test_normalize_retags_and_keeps_stamp() {
        let frame = Frame::new(2, 2, PixelFormat::Bgra32, vec![7u8; 16]).unwrap();
        let stamp = frame.timestamp();
        let frame = frame.stamped(3, stamp);
        let normalized = normalize(frame);
        assert_eq!(normalized.format(), PixelFormat::Rgb24);
        assert_eq!(normalized.meta().sequence, 3);
        assert_eq!(normalized.timestamp(), stamp);
        assert_eq!(normalized.data().len(), 12);
    }
}
