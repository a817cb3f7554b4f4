use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::bounding_box::BoundingBox;

/// One decoded video frame: tightly packed RGB bytes, row-major.
///
/// `index` is the 0-based position in the sequence the frame came from.
/// Crops and resized faces are frames too; they carry the index of the
/// frame they were cut from.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Wraps an `image` RGB buffer without copying.
    pub fn from_rgb_image(image: image::RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copy of the pixels inside `bbox`, rounded to whole pixels.
    ///
    /// The box may reach past the frame edges (head regions often do);
    /// pixels outside the frame are zero-filled so the crop always has the
    /// box's own dimensions.
    pub fn crop(&self, bbox: &BoundingBox) -> Frame {
        let x1 = bbox.x1.round() as i64;
        let y1 = bbox.y1.round() as i64;
        let crop_w = (bbox.x2.round() as i64 - x1).max(1) as usize;
        let crop_h = (bbox.y2.round() as i64 - y1).max(1) as usize;
        let channels = self.channels as usize;

        let src = self.as_ndarray();
        let fw = self.width as i64;
        let fh = self.height as i64;
        let mut data = vec![0u8; crop_w * crop_h * channels];

        for row in 0..crop_h {
            let sy = y1 + row as i64;
            if sy < 0 || sy >= fh {
                continue;
            }
            for col in 0..crop_w {
                let sx = x1 + col as i64;
                if sx < 0 || sx >= fw {
                    continue;
                }
                let dst = (row * crop_w + col) * channels;
                for c in 0..channels {
                    data[dst + c] = src[[sy as usize, sx as usize, c]];
                }
            }
        }

        Frame::new(data, crop_w as u32, crop_h as u32, self.channels, self.index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
