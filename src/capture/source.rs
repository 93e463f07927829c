//! Pixel sources the capture loop grabs from

use crate::capture::frame::{Frame, PixelFormat};
use crate::capture::region::CaptureRegion;
use crate::error::CaptureError;

/// Anything that can produce one frame of a screen region on demand
pub trait FrameSource: Send + 'static {
    fn grab(&mut self, region: &CaptureRegion) -> Result<Frame, CaptureError>;

    /// Short name for logs
    fn name(&self) -> &str {
        "source"
    }
}

impl<F> FrameSource for F
where
    F: FnMut(&CaptureRegion) -> Result<Frame, CaptureError> + Send + 'static,
{
    fn grab(&mut self, region: &CaptureRegion) -> Result<Frame, CaptureError> {
        self(region)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Synthetic pictures with no capture cost
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Every frame the same colour
    Solid([u8; 3]),
    /// Cycle through the colours, one per grab
    Cycle(Vec<[u8; 3]>),
    /// A vertical bar sweeping across a dark background
    MovingBar { background: [u8; 3], bar: [u8; 3] },
}

/// Generates frames of the requested region without touching the display
#[derive(Debug, Clone)]
pub struct TestPattern {
    pattern: Pattern,
    format: PixelFormat,
    tick: u64,
}

impl TestPattern {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            format: PixelFormat::Rgb24,
            tick: 0,
        }
    }

    /// Emit frames in another layout, e.g. `Bgra32` like most desktop grabbers
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    fn pixel(&self, x: u32, width: u32) -> [u8; 3] {
        match &self.pattern {
            Pattern::Solid(rgb) => *rgb,
            Pattern::Cycle(colors) if colors.is_empty() => [0, 0, 0],
            Pattern::Cycle(colors) => colors[(self.tick % colors.len() as u64) as usize],
            Pattern::MovingBar { background, bar } => {
                let bar_width = (width / 8).max(1);
                let start = (self.tick * u64::from(bar_width) % u64::from(width.max(1))) as u32;
                if x >= start && x < start + bar_width {
                    *bar
                } else {
                    *background
                }
            }
        }
    }

    fn encode(&self, rgb: [u8; 3], out: &mut Vec<u8>) {
        match self.format {
            PixelFormat::Rgb24 => out.extend_from_slice(&rgb),
            PixelFormat::Bgr24 => out.extend_from_slice(&[rgb[2], rgb[1], rgb[0]]),
            PixelFormat::Rgba32 => out.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]),
            PixelFormat::Bgra32 => out.extend_from_slice(&[rgb[2], rgb[1], rgb[0], 255]),
        }
    }
}

impl FrameSource for TestPattern {
    fn grab(&mut self, region: &CaptureRegion) -> Result<Frame, CaptureError> {
        let (width, height) = (region.width, region.height);
        let mut row = Vec::with_capacity(width as usize * self.format.channels());
        for x in 0..width {
            self.encode(self.pixel(x, width), &mut row);
        }
        let data = row.repeat(height as usize);
        self.tick += 1;
        Frame::new(width, height, self.format, data)
    }

    fn name(&self) -> &str {
        "test-pattern"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::convert::to_rgb;

    fn region() -> CaptureRegion {
        CaptureRegion::new(0, 0, 16, 10).unwrap()
    }

    #[test]
    fn test_pattern_matches_region() {
        let mut source = TestPattern::new(Pattern::Solid([1, 2, 3]));
        let frame = source.grab(&region()).unwrap();
        assert_eq!(frame.dimensions(), (16, 10));
        assert!(frame.data().chunks(3).all(|px| px == [1, 2, 3]));
    }

    #[test]
    fn test_cycle_advances_per_grab() {
        let mut source = TestPattern::new(Pattern::Cycle(vec![[255, 0, 0], [0, 255, 0]]));
        let first = source.grab(&region()).unwrap();
        let second = source.grab(&region()).unwrap();
        let third = source.grab(&region()).unwrap();
        assert_eq!(&first.data()[..3], &[255, 0, 0]);
        assert_eq!(&second.data()[..3], &[0, 255, 0]);
        assert_eq!(&third.data()[..3], &[255, 0, 0]);
    }

    #[test]
    fn test_bgra_pattern_round_trips_through_convert() {
        let mut source =
            TestPattern::new(Pattern::Solid([10, 20, 30])).with_format(PixelFormat::Bgra32);
        let frame = source.grab(&region()).unwrap();
        assert_eq!(&frame.data()[..4], &[30, 20, 10, 255]);
        assert_eq!(&to_rgb(&frame)[..3], &[10, 20, 30]);
    }

    #[test]
    fn test_moving_bar_moves() {
        let mut source = TestPattern::new(Pattern::MovingBar {
            background: [0, 0, 0],
            bar: [255, 255, 255],
        });
        let a = source.grab(&region()).unwrap();
        let b = source.grab(&region()).unwrap();
        assert_ne!(a.data(), b.data());
    }

    #[test]
    fn test_closure_source() {
        let mut calls = 0;
        let mut source = move |r: &CaptureRegion| {
            calls += 1;
            if calls == 1 {
                Err(CaptureError::Grab("display busy".into()))
            } else {
                Ok(Frame::solid(r.width, r.height, [0, 0, 0]))
            }
        };
        assert!(source.grab(&region()).is_err());
        assert!(source.grab(&region()).is_ok());
    }
}
