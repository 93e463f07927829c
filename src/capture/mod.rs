pub mod convert;
pub mod frame;
pub mod recorder;
pub mod region;
#[cfg(feature = "screen-capture")]
pub mod screen;
pub mod source;

pub use frame::{ChannelOrder, Frame, FrameInfo, FrameSequence, PixelFormat};
pub use recorder::CaptureLoop;
pub use region::{CaptureRegion, RegionSelection, MIN_REGION_SIZE};
#[cfg(feature = "screen-capture")]
pub use screen::ScreenSource;
pub use source::{FrameSource, Pattern, TestPattern};
