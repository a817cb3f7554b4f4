use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

pub const OUTLINE_COLOR: [u8; 3] = [255, 0, 0];
pub const OUTLINE_WIDTH: u32 = 6;

/// Draws the outline of `bbox` into `frame`, `thickness` pixels wide and
/// growing inward from the box edges. Parts outside the frame are clipped.
pub fn draw_box_outline(frame: &mut Frame, bbox: &BoundingBox, color: [u8; 3], thickness: u32) {
    if frame.channels() != 3 || thickness == 0 || !bbox.is_valid() {
        return;
    }
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    let x1 = bbox.x1.round() as i64;
    let y1 = bbox.y1.round() as i64;
    let x2 = bbox.x2.round() as i64;
    let y2 = bbox.y2.round() as i64;
    let t = thickness as i64;

    let mut pixels = frame.as_ndarray_mut();
    for y in y1.max(0)..=y2.min(h - 1) {
        for x in x1.max(0)..=x2.min(w - 1) {
            let on_edge = x - x1 < t || x2 - x < t || y - y1 < t || y2 - y < t;
            if on_edge {
                for (c, value) in color.iter().enumerate() {
                    pixels[[y as usize, x as usize, c]] = *value;
                }
            }
        }
    }
}

/// Copy of `frame` with the outline drawn.
pub fn with_box_outline(frame: &Frame, bbox: &BoundingBox) -> Frame {
    let mut annotated = frame.clone();
    draw_box_outline(&mut annotated, bbox, OUTLINE_COLOR, OUTLINE_WIDTH);
    annotated
}
