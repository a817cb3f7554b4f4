//! Facial landmark points predicted on a face crop.
//!
//! Point count depends on the model (5 for the YOLO face-pose model, 68 for
//! dlib-style predictors). Points the model could not see are `None`, so a
//! visible point may sit anywhere, including left of or above the crop.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    points: Vec<Option<(f64, f64)>>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Option<(f64, f64)>>) -> Self {
        Self { points }
    }

    /// Landmarks where every point is visible.
    pub fn from_visible(points: Vec<(f64, f64)>) -> Self {
        Self::new(points.into_iter().map(Some).collect())
    }

    pub fn points(&self) -> &[Option<(f64, f64)>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_visible(&self) -> bool {
        self.points.iter().any(Option::is_some)
    }
}
