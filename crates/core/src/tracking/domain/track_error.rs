use thiserror::Error;

use crate::tracking::domain::tracker_config::ConfigError;

/// Failures that end a tracking run.
///
/// A short detection result is not among them: the tracker freezes every
/// track at its last box instead. The one exception is frame 0, where there
/// is no box to freeze to.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("cannot track an empty frame sequence")]
    EmptySequence,
    #[error("frame 0 yielded {found} usable face boxes, need {expected} to seed the tracks")]
    FirstFrameMiss { found: usize, expected: usize },
    #[error("face detector failed on frame {frame}: {source}")]
    Detector {
        frame: usize,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("landmark predictor failed on frame {frame}, speaker slot {slot}: {source}")]
    Landmarks {
        frame: usize,
        slot: usize,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("tracker state holds {tracks} tracks, tracker is configured for {speakers} speakers")]
    StateMismatch { tracks: usize, speakers: usize },
    #[error("frame {frame} has {channels} channels, expected RGB")]
    UnsupportedFrame { frame: usize, channels: u8 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
