use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::tracking::domain::track::{LandmarkResult, Track};
use crate::tracking::domain::track_error::TrackError;

/// Everything carried from one frame to the next during a tracking run.
///
/// Owned by a single run and discarded when it ends.
#[derive(Clone, Debug)]
pub struct TrackerState {
    tracks: Vec<Track>,
    last_detection_frame: Option<usize>,
    frames_processed: usize,
}

impl TrackerState {
    /// One empty track per speaker slot.
    pub fn new(speakers: usize) -> Self {
        Self {
            tracks: (0..speakers).map(Track::new).collect(),
            last_detection_frame: None,
            frames_processed: 0,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    /// Position of the most recent frame whose detection filled every slot.
    pub fn last_detection_frame(&self) -> Option<usize> {
        self.last_detection_frame
    }

    pub fn record_detection(&mut self, frame_position: usize) {
        self.last_detection_frame = Some(frame_position);
    }

    /// Each track's most recent box, or `None` before the first frame.
    pub fn last_boxes(&self) -> Option<Vec<BoundingBox>> {
        self.tracks
            .iter()
            .map(|t| t.last_box().copied())
            .collect()
    }

    /// Appends one frame's results, one entry per slot in slot order.
    ///
    /// Takes exactly one entry per track so no track can fall behind; any
    /// other count leaves the state untouched.
    pub fn append(
        &mut self,
        entries: Vec<(Frame, LandmarkResult, BoundingBox)>,
    ) -> Result<(), TrackError> {
        if entries.len() != self.tracks.len() {
            return Err(TrackError::StateMismatch {
                tracks: self.tracks.len(),
                speakers: entries.len(),
            });
        }
        for (track, (face, landmarks, bbox)) in self.tracks.iter_mut().zip(entries) {
            track.push(face, landmarks, bbox);
        }
        self.frames_processed += 1;
        Ok(())
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}
