use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Returns tight face boxes in a stable order (most confident first for
/// the shipped detector). May return any number of boxes, including none;
/// deciding what a short result means is the tracker's job.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
