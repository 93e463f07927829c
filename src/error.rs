//! Error types for capture and encoding

use std::io;

use thiserror::Error;

use crate::capture::ChannelOrder;

/// Errors raised by the capture loop and frame sources
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture region {width}x{height} is below the {min}px minimum")]
    InvalidRegion { width: u32, height: u32, min: u32 },

    #[error("no capture region configured")]
    NoRegionConfigured,

    #[error("capture is already running")]
    AlreadyRunning,

    #[error("frames per second must be greater than zero")]
    InvalidFps,

    /// The previous session still holds the frame source
    #[error("frame source is still owned by a stopping capture session")]
    SourceBusy,

    #[error("frame buffer holds {found} bytes, expected {expected}")]
    InvalidFrame { expected: usize, found: usize },

    /// A single grab failed; the loop skips the frame and carries on
    #[error("frame grab failed: {0}")]
    Grab(String),

    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Errors raised while turning a frame sequence into an animation
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame sequence is empty")]
    EmptySequence,

    #[error("frame {index} is {found:?}, expected {expected:?} like frame 0")]
    DimensionMismatch {
        index: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("frame {index} is tagged {found:?} but the encoder expects {expected:?}")]
    ChannelOrderMismatch {
        index: usize,
        expected: ChannelOrder,
        found: ChannelOrder,
    },

    #[error("{width}x{height} exceeds the GIF size limit of 65535")]
    FrameTooLarge { width: u32, height: u32 },

    #[error("frames per second must be greater than zero")]
    InvalidFps,

    #[error("GIF encoding failed: {0}")]
    Gif(#[from] gif::EncodingError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl EncodeError {
    /// True for problems with the input sequence or settings, as opposed to
    /// failures of the codec or the filesystem.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, EncodeError::Gif(_) | EncodeError::Io(_))
    }
}
