use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_DETECT_EVERY, DEFAULT_HEAD_SCALE, DEFAULT_SPEAKERS, FACE_SIZE,
};
use crate::tracking::domain::track_assigner::AssignmentPolicy;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("speaker count must be at least 1")]
    NoSpeakers,
    #[error("detection interval must be at least 1, got {0}")]
    ZeroInterval(usize),
    #[error("head scale must be a positive finite number, got {0}")]
    InvalidScale(f64),
    #[error("face size must be at least 1 pixel")]
    ZeroFaceSize,
}

/// Parameters of one tracking run.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Number of speaker slots N.
    pub speakers: usize,
    /// Run the detector on frames whose position is a multiple of this.
    pub detect_every: usize,
    /// Head-region enlargement applied to fresh detector boxes.
    pub head_scale: f64,
    pub policy: AssignmentPolicy,
    /// Side of the square canvas faces are resized to.
    pub face_size: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            speakers: DEFAULT_SPEAKERS,
            detect_every: DEFAULT_DETECT_EVERY,
            head_scale: DEFAULT_HEAD_SCALE,
            policy: AssignmentPolicy::default(),
            face_size: FACE_SIZE,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speakers == 0 {
            return Err(ConfigError::NoSpeakers);
        }
        if self.detect_every == 0 {
            return Err(ConfigError::ZeroInterval(self.detect_every));
        }
        if !self.head_scale.is_finite() || self.head_scale <= 0.0 {
            return Err(ConfigError::InvalidScale(self.head_scale));
        }
        if self.face_size == 0 {
            return Err(ConfigError::ZeroFaceSize);
        }
        Ok(())
    }
}
