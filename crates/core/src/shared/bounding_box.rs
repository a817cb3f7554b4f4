use serde::{Deserialize, Serialize};

/// Axis-aligned box in frame pixel space, corners `(x1, y1)` and `(x2, y2)`.
///
/// Used both for tight detector output and for the enlarged head regions
/// the tracker crops from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Finite corners with strictly positive width and height.
    pub fn is_valid(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x1 < self.x2
            && self.y1 < self.y2
    }

    /// Square head region centered on this box.
    ///
    /// Side is `scale * max(width, height)`. Detectors return tight facial
    /// boxes; cropping and landmark prediction need the surrounding head.
    pub fn to_head_region(&self, scale: f64) -> BoundingBox {
        let (cx, cy) = self.center();
        let half = self.width().max(self.height()) * scale / 2.0;
        BoundingBox::new(cx - half, cy - half, cx + half, cy + half)
    }

    /// Intersection over union with pixel-inclusive edges.
    ///
    /// Both the intersection and the areas add one pixel per dimension, so
    /// boxes sharing an edge column still overlap by one pixel. Disjoint
    /// boxes score exactly 0.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1 + 1.0).max(0.0) * (iy2 - iy1 + 1.0).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }

        let union = self.pixel_area() + other.pixel_area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        (inter / union).clamp(0.0, 1.0)
    }

    fn pixel_area(&self) -> f64 {
        (self.width() + 1.0) * (self.height() + 1.0)
    }
}
