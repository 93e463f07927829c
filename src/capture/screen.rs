//! Desktop capture through xcap

use image::imageops;
use tracing::{debug, instrument};
use xcap::Monitor;

use crate::capture::frame::{Frame, PixelFormat};
use crate::capture::region::CaptureRegion;
use crate::capture::source::FrameSource;
use crate::error::CaptureError;

/// Grabs the region from whichever monitor contains its top-left corner
#[derive(Debug, Default)]
pub struct ScreenSource {
    _private: (),
}

impl ScreenSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn grab_error(e: impl std::fmt::Display) -> CaptureError {
    CaptureError::Grab(e.to_string())
}

impl FrameSource for ScreenSource {
    #[instrument(skip(self), level = "trace")]
    fn grab(&mut self, region: &CaptureRegion) -> Result<Frame, CaptureError> {
        // Monitor handles are not Send on every platform, so look up per grab
        let monitor = Monitor::from_point(region.x, region.y).map_err(grab_error)?;
        let origin_x = monitor.x().map_err(grab_error)?;
        let origin_y = monitor.y().map_err(grab_error)?;

        let image = monitor.capture_image().map_err(grab_error)?;

        let left = (region.x - origin_x).max(0) as u32;
        let top = (region.y - origin_y).max(0) as u32;
        if left + region.width > image.width() || top + region.height > image.height() {
            return Err(CaptureError::Grab(format!(
                "region {} leaves the {}x{} monitor",
                region,
                image.width(),
                image.height()
            )));
        }

        let cropped = imageops::crop_imm(&image, left, top, region.width, region.height).to_image();
        debug!(width = cropped.width(), height = cropped.height(), "screen grab");

        Frame::new(
            region.width,
            region.height,
            PixelFormat::Rgba32,
            cropped.into_raw(),
        )
    }

    fn name(&self) -> &str {
        "xcap"
    }
}
