use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::frame::Frame;

/// Domain interface for facial landmark prediction on a face crop.
///
/// Coordinates are in the crop's pixel space. `Ok(None)` means the model
/// found no face in the crop, which is a normal per-frame outcome.
pub trait LandmarkPredictor: Send {
    fn predict(&mut self, face: &Frame)
        -> Result<Option<FaceLandmarks>, Box<dyn std::error::Error>>;
}
