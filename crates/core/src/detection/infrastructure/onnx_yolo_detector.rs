use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::onnx_yolo_face_model::{FaceCandidate, OnnxYoloFaceModel};

/// Face detector backed by the YOLO face model.
///
/// Boxes come back most confident first, so truncating to the speaker
/// count keeps the strongest faces.
pub struct OnnxYoloDetector {
    model: OnnxYoloFaceModel,
}

impl OnnxYoloDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::from_model(OnnxYoloFaceModel::new(model_path, confidence)?))
    }

    pub fn from_model(model: OnnxYoloFaceModel) -> Self {
        Self { model }
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        Ok(boxes_of(self.model.infer(frame)?))
    }
}

fn boxes_of(candidates: Vec<FaceCandidate>) -> Vec<BoundingBox> {
    candidates.into_iter().map(|c| c.bbox).collect()
}
