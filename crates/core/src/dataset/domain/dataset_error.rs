use std::path::PathBuf;

use thiserror::Error;

use crate::tracking::domain::track_error::TrackError;

/// Failures while turning one clip into dataset artifacts.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("clip name {clip} is shared by {first} and {second}")]
    DuplicateClip {
        clip: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("clip {clip} has no frames in range")]
    EmptyClip { clip: String },
    #[error("tracking failed: {0}")]
    Track(#[from] TrackError),
    #[error("failed to write video {path}: {source}")]
    Video {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode landmarks for {path}: {source}")]
    Landmarks {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
