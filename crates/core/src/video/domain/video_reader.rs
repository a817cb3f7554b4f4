use std::ops::Range;
use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Decodes a source video into RGB frames.
pub trait VideoReader: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in decode order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);

    /// Decodes the frames whose positions fall in `range`.
    ///
    /// Stops early at end of stream, so the result may be shorter than the
    /// range. Frames keep their position in the source as their index.
    /// The default decodes from the first frame; readers that can seek
    /// should override it.
    fn read_range(
        &mut self,
        range: Range<usize>,
    ) -> Result<Vec<Frame>, Box<dyn std::error::Error>> {
        let count = range.end.saturating_sub(range.start);
        self.frames().skip(range.start).take(count).collect()
    }
}
