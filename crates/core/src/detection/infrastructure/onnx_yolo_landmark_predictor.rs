use std::path::Path;

use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::detection::domain::landmark_predictor::LandmarkPredictor;
use crate::shared::frame::Frame;

use super::onnx_yolo_face_model::{FaceCandidate, OnnxYoloFaceModel};

/// Landmark predictor that re-runs the YOLO face model on a face crop and
/// keeps the keypoints of the most confident face.
///
/// Points are in crop coordinates.
pub struct OnnxYoloLandmarkPredictor {
    model: OnnxYoloFaceModel,
}

impl OnnxYoloLandmarkPredictor {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::from_model(OnnxYoloFaceModel::new(model_path, confidence)?))
    }

    pub fn from_model(model: OnnxYoloFaceModel) -> Self {
        Self { model }
    }
}

impl LandmarkPredictor for OnnxYoloLandmarkPredictor {
    fn predict(&mut self, face: &Frame) -> Result<Option<FaceLandmarks>, Box<dyn std::error::Error>> {
        Ok(best_landmarks(self.model.infer(face)?))
    }
}

/// Keypoints of the first (most confident) candidate, if it has any
/// visible point.
fn best_landmarks(candidates: Vec<FaceCandidate>) -> Option<FaceLandmarks> {
    candidates
        .into_iter()
        .next()
        .and_then(|c| c.keypoints)
        .map(FaceLandmarks::new)
        .filter(FaceLandmarks::has_visible)
}
