use std::ops::Index;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, EncodeError};

/// Frame data, immutable once captured
#[derive(Clone)]
pub struct Frame {
    /// Row-major pixel bytes, `height * stride` long
    data: Bytes,

    meta: Arc<FrameInfo>,

    /// Capture timestamp, used for cadence checks
    timestamp: Instant,
}

/// Frame metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub stride: u32,
    pub format: PixelFormat,
}

/// Pixel layouts a frame can be tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Rgba32,
    Bgra32,
}

/// Order of the colour channels in a pixel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
            PixelFormat::Rgba32 | PixelFormat::Bgra32 => 4,
        }
    }

    pub fn order(self) -> ChannelOrder {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Rgba32 => ChannelOrder::Rgb,
            PixelFormat::Bgr24 | PixelFormat::Bgra32 => ChannelOrder::Bgr,
        }
    }

    pub fn has_alpha(self) -> bool {
        self.channels() == 4
    }
}

impl Frame {
    /// Wrap tightly packed pixel bytes.
    ///
    /// Fails if `data` is not exactly `width * height * channels` bytes.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: impl Into<Bytes>,
    ) -> Result<Self, CaptureError> {
        let data = data.into();
        let stride = width as usize * format.channels();
        let expected = stride * height as usize;
        if data.len() != expected {
            return Err(CaptureError::InvalidFrame {
                expected,
                found: data.len(),
            });
        }

        Ok(Self {
            data,
            meta: Arc::new(FrameInfo {
                sequence: 0,
                width,
                height,
                stride: stride as u32,
                format,
            }),
            timestamp: Instant::now(),
        })
    }

    /// A frame where every pixel has the same colour
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data: Vec<u8> = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            data: Bytes::from(data),
            meta: Arc::new(FrameInfo {
                sequence: 0,
                width,
                height,
                stride: width * 3,
                format: PixelFormat::Rgb24,
            }),
            timestamp: Instant::now(),
        }
    }

    /// Same pixels, stamped with a capture sequence number and time
    pub fn stamped(mut self, sequence: u64, timestamp: Instant) -> Self {
        let mut meta = (*self.meta).clone();
        meta.sequence = sequence;
        self.meta = Arc::new(meta);
        self.timestamp = timestamp;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn meta(&self) -> &FrameInfo {
        &self.meta
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    pub fn format(&self) -> PixelFormat {
        self.meta.format
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.meta.width, self.meta.height)
    }

    /// Iterate over rows of `stride` bytes
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.meta.stride.max(1) as usize)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("meta", &self.meta)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Frames in capture order, which is also playback order
#[derive(Debug, Clone, Default)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[Frame] {
        &self.frames
    }

    /// First frame whose size differs from frame 0, as
    /// `(index, expected, found)`
    pub fn dimension_mismatch(&self) -> Option<(usize, (u32, u32), (u32, u32))> {
        let expected = self.first()?.dimensions();
        self.frames
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, frame)| frame.dimensions() != expected)
            .map(|(index, frame)| (index, expected, frame.dimensions()))
    }

    /// Check that every frame shares the size of the first
    pub fn validate_dimensions(&self) -> Result<(), EncodeError> {
        match self.dimension_mismatch() {
            Some((index, expected, found)) => Err(EncodeError::DimensionMismatch {
                index,
                expected,
                found,
            }),
            None => Ok(()),
        }
    }

    pub fn into_vec(self) -> Vec<Frame> {
        self.frames
    }
}

impl From<Vec<Frame>> for FrameSequence {
    fn from(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl FromIterator<Frame> for FrameSequence {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl Extend<Frame> for FrameSequence {
    fn extend<I: IntoIterator<Item = Frame>>(&mut self, iter: I) {
        self.frames.extend(iter);
    }
}

impl Index<usize> for FrameSequence {
    type Output = Frame;

    fn index(&self, index: usize) -> &Frame {
        &self.frames[index]
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rejects_short_buffer() {
        let err = Frame::new(4, 4, PixelFormat::Rgb24, vec![0u8; 47]).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InvalidFrame {
                expected: 48,
                found: 47
            }
        ));
    }

    #[test]
    fn test_frame_stride_follows_format() {
        let frame = Frame::new(5, 2, PixelFormat::Bgra32, vec![0u8; 40]).unwrap();
        assert_eq!(frame.meta().stride, 20);
        assert_eq!(frame.rows().count(), 2);
        assert_eq!(frame.format().order(), ChannelOrder::Bgr);
        assert!(frame.format().has_alpha());
    }

    #[test]
    fn test_solid_frame() {
        let frame = Frame::solid(3, 2, [1, 2, 3]);
        assert_eq!(frame.data().len(), 18);
        assert!(frame.data().chunks(3).all(|px| px == [1, 2, 3]));
    }

    #[test]
    fn test_stamped_keeps_pixels() {
        let frame = Frame::solid(2, 2, [9, 9, 9]);
        let later = Instant::now();
        let stamped = frame.clone().stamped(7, later);
        assert_eq!(stamped.meta().sequence, 7);
        assert_eq!(stamped.timestamp(), later);
        assert_eq!(stamped.data(), frame.data());
    }

    #[test]
    fn test_dimension_mismatch_reports_first_offender() {
        let seq: FrameSequence = vec![
            Frame::solid(10, 10, [0, 0, 0]),
            Frame::solid(10, 10, [0, 0, 0]),
            Frame::solid(12, 10, [0, 0, 0]),
            Frame::solid(8, 8, [0, 0, 0]),
        ]
        .into();
        assert_eq!(seq.dimension_mismatch(), Some((2, (10, 10), (12, 10))));
    }

    #[test]
    fn test_uniform_sequence_has_no_mismatch() {
        let seq: FrameSequence = (0..3).map(|_| Frame::solid(4, 4, [1, 1, 1])).collect();
        assert_eq!(seq.dimension_mismatch(), None);
        assert_eq!(FrameSequence::new().dimension_mismatch(), None);
        assert!(seq.validate_dimensions().is_ok());
    }

    #[test]
    fn test_validate_dimensions_reports_mismatch() {
        let seq: FrameSequence = vec![Frame::solid(4, 4, [0, 0, 0]), Frame::solid(4, 5, [0, 0, 0])].into();
        assert!(matches!(
            seq.validate_dimensions(),
            Err(EncodeError::DimensionMismatch { index: 1, .. })
        ));
    }
}
