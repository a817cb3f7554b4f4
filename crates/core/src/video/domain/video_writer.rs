use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Encodes RGB frames into a video file.
///
/// `metadata` fixes the output size and frame rate; every written frame
/// must match that size.
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes the encoder and finalizes the container.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
