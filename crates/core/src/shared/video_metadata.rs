use std::path::PathBuf;

/// Stream properties reported by a [`VideoReader`](crate::video::domain::video_reader::VideoReader).
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Metadata for a writer producing `width` x `height` frames at `fps`.
    pub fn for_output(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            total_frames: 0,
            codec: String::new(),
            source_path: None,
        }
    }

    /// Stream length in seconds, or 0 when the frame rate is unknown.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }
}
