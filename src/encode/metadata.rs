use crate::capture::FrameSequence;

/// Read-only summary of a recording
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceMetadata {
    pub count: usize,
    pub width: u32,
    pub height: u32,
    pub channel_count: usize,
    /// `count / frames_per_second`
    pub estimated_duration_seconds: f64,
}

/// Summarize `frames` as played back at `frames_per_second`.
///
/// Returns `None` for an empty sequence. Nothing is encoded.
pub fn frame_metadata(frames: &FrameSequence, frames_per_second: u32) -> Option<SequenceMetadata> {
    let first = frames.first()?;
    let estimated_duration_seconds = if frames_per_second == 0 {
        0.0
    } else {
        frames.len() as f64 / f64::from(frames_per_second)
    };

    Some(SequenceMetadata {
        count: frames.len(),
        width: first.width(),
        height: first.height(),
        channel_count: first.format().channels(),
        estimated_duration_seconds,
    })
}
