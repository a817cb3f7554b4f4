use image::imageops::FilterType;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::tracking::domain::track_error::TrackError;

/// Cuts `bbox` out of `frame` and resizes it to a `size` x `size` canvas.
///
/// Parts of the box outside the frame come out black. Bicubic resampling.
pub fn crop_face(frame: &Frame, bbox: &BoundingBox, size: u32) -> Result<Frame, TrackError> {
    if frame.channels() != 3 {
        return Err(TrackError::UnsupportedFrame {
            frame: frame.index(),
            channels: frame.channels(),
        });
    }

    let crop = frame.crop(bbox);
    if crop.width() == size && crop.height() == size {
        return Ok(crop);
    }

    let index = crop.index();
    let (w, h) = (crop.width(), crop.height());
    let img = image::RgbImage::from_raw(w, h, crop.data().to_vec()).ok_or(
        TrackError::UnsupportedFrame {
            frame: index,
            channels: 3,
        },
    )?;
    let resized = image::imageops::resize(&img, size, size, FilterType::CatmullRom);
    Ok(Frame::from_rgb_image(resized, index))
}
