use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Landmarks for one face crop; `None` when the predictor found no face.
pub type LandmarkResult = Option<FaceLandmarks>;

/// One speaker slot and everything accumulated for it across a clip.
///
/// The three sequences are indexed by frame position and only grow
/// together, so they always have the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    id: usize,
    faces: Vec<Frame>,
    landmarks: Vec<LandmarkResult>,
    boxes: Vec<BoundingBox>,
}

impl Track {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            faces: Vec::new(),
            landmarks: Vec::new(),
            boxes: Vec::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn push(&mut self, face: Frame, landmarks: LandmarkResult, bbox: BoundingBox) {
        self.faces.push(face);
        self.landmarks.push(landmarks);
        self.boxes.push(bbox);
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn last_box(&self) -> Option<&BoundingBox> {
        self.boxes.last()
    }

    pub fn faces(&self) -> &[Frame] {
        &self.faces
    }

    pub fn landmarks(&self) -> &[LandmarkResult] {
        &self.landmarks
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// Fraction of frames where the predictor found landmarks.
    pub fn landmark_coverage(&self) -> f64 {
        if self.landmarks.is_empty() {
            return 0.0;
        }
        let found = self
            .landmarks
            .iter()
            .filter(|lm| lm.as_ref().is_some_and(|l| l.has_visible()))
            .count();
        found as f64 / self.landmarks.len() as f64
    }
}
