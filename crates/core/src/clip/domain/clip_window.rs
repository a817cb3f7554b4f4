//! Splitting a long recording into fixed-length clips.
use std::ops::Range;

use thiserror::Error;

use crate::shared::constants::{DEFAULT_CLIP_DURATION, DEFAULT_CLIP_START};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClipPlanError {
    #[error("clip duration must be at least one second")]
    ZeroDuration,
}

/// A `[start, end)` span of a source video, in whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClipWindow {
    pub start: u32,
    pub end: u32,
}

impl ClipWindow {
    pub fn duration(&self) -> u32 {
        self.end - self.start
    }

    /// `"{stem}_{start:04}-{end:04}"`, e.g. `talk_0001-0008`.
    pub fn name(&self, stem: &str) -> String {
        format!("{stem}_{:04}-{:04}", self.start, self.end)
    }

    /// Frame positions covered at `fps`.
    ///
    /// Starts at `round(start * fps)` and spans `round(duration * fps)`
    /// frames; the reader stops early if the stream ends first.
    pub fn frame_range(&self, fps: f64) -> Range<usize> {
        let first = (self.start as f64 * fps).round().max(0.0) as usize;
        let count = (self.duration() as f64 * fps).round().max(0.0) as usize;
        first..first + count
    }
}

/// How a recording is cut into clips.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipPlan {
    /// Second at which the first clip starts.
    pub start: u32,
    /// Length of every clip, in seconds.
    pub duration: u32,
    /// Overrides the measured video length when set.
    pub max_length: Option<u32>,
}

impl Default for ClipPlan {
    fn default() -> Self {
        Self {
            start: DEFAULT_CLIP_START,
            duration: DEFAULT_CLIP_DURATION,
            max_length: None,
        }
    }
}

impl ClipPlan {
    /// Windows `(s, s + duration)` for `s = start, start + duration, ...`
    /// while `s` is before the end of the video.
    ///
    /// `video_secs` is rounded up to whole seconds. The last window may run
    /// past the end of the video.
    pub fn windows(&self, video_secs: f64) -> Result<Vec<ClipWindow>, ClipPlanError> {
        if self.duration == 0 {
            return Err(ClipPlanError::ZeroDuration);
        }
        let length = match self.max_length {
            Some(max) if max > 0 => max,
            _ => video_secs.max(0.0).ceil() as u32,
        };

        Ok((self.start..length)
            .step_by(self.duration as usize)
            .map(|start| ClipWindow {
                start,
                end: start + self.duration,
            })
            .collect())
    }
}
