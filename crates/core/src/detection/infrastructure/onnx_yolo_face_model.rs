//! YOLO face-pose model run through ONNX Runtime.
//!
//! Shared by the face detector and the landmark predictor: both only differ
//! in which part of a [`FaceCandidate`] they keep.
use std::path::Path;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::load_session;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Keypoints per detection.
const NUM_KEYPOINTS: usize = 5;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// One face found by the model, in source frame coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceCandidate {
    pub bbox: BoundingBox,
    pub confidence: f64,
    /// Five points (eyes, nose, mouth corners); low-confidence points are `None`.
    pub keypoints: Option<Vec<Option<(f64, f64)>>>,
}

pub struct OnnxYoloFaceModel {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloFaceModel {
    /// Load a YOLO face ONNX model.
    ///
    /// The input resolution is read from the model's NCHW input shape and
    /// falls back to 640 when the shape is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("YOLO face model input size: {input_size}");

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Runs the model and returns surviving faces, most confident first.
    pub fn infer(&mut self, frame: &Frame) -> Result<Vec<FaceCandidate>, Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("expected an RGB frame, got {} channels", frame.channels()).into());
        }
        let (input_tensor, geometry) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let candidates = parse_rows(data, &shape, self.confidence, &geometry);
        Ok(nms(candidates, NMS_IOU_THRESH))
    }
}

/// Mapping from letterboxed model space back to the source frame.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: f64,
    pad_y: f64,
}

impl Letterbox {
    fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`, padding with
/// 114 gray.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // nearest neighbour
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x: pad_x as f64,
            pad_y: pad_y as f64,
        },
    )
}

/// Decodes raw output rows `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
///
/// The output is either `[1, features, detections]` or
/// `[1, detections, features]`; the smaller axis is taken as features.
fn parse_rows(
    data: &[f32],
    shape: &[usize],
    min_confidence: f64,
    geometry: &Letterbox,
) -> Vec<FaceCandidate> {
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    let value = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    if num_feats < 5 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for det in 0..num_dets {
        let confidence = value(det, 4);
        if confidence < min_confidence {
            continue;
        }

        let (cx, cy, w, h) = (value(det, 0), value(det, 1), value(det, 2), value(det, 3));
        let (x1, y1) = geometry.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = geometry.unmap(cx + w / 2.0, cy + h / 2.0);

        let keypoints = (num_feats >= 5 + NUM_KEYPOINTS * 3).then(|| {
            (0..NUM_KEYPOINTS)
                .map(|k| {
                    let base = 5 + k * 3;
                    (value(det, base + 2) >= KEYPOINT_CONF_THRESH)
                        .then(|| geometry.unmap(value(det, base), value(det, base + 1)))
                })
                .collect()
        });

        candidates.push(FaceCandidate {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence,
            keypoints,
        });
    }
    candidates
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(mut candidates: Vec<FaceCandidate>, iou_thresh: f64) -> Vec<FaceCandidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<FaceCandidate> = Vec::new();
    for candidate in candidates {
        if keep
            .iter()
            .all(|kept| continuous_iou(&kept.bbox, &candidate.bbox) <= iou_thresh)
        {
            keep.push(candidate);
        }
    }
    keep
}

/// Area-based IoU without the pixel-inclusive offset, for model-space boxes.
fn continuous_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    inter / (a.width() * a.height() + b.width() * b.height() - inter)
}
