use std::path::Path;

use ffmpeg_next::Rational;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Frame rate used when the metadata carries none.
const FALLBACK_FPS: i32 = 25;

struct Encoding {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    frame_time_base: Rational,
}

/// Encodes RGB frames to MPEG-4 / YUV420P via ffmpeg-next.
pub struct FfmpegWriter {
    encoding: Option<Encoding>,
    width: u32,
    height: u32,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            encoding: None,
            width: 0,
            height: 0,
            frame_count: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.frame_count
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let fps = match metadata.fps.round() as i32 {
            f if f > 0 => f,
            _ => FALLBACK_FPS,
        };
        let frame_time_base = Rational(1, fps);

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(frame_time_base);
        encoder_ctx.set_frame_rate(Some(Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.width = metadata.width;
        self.height = metadata.height;
        self.frame_count = 0;
        self.encoding = Some(Encoding {
            octx,
            encoder,
            scaler,
            frame_time_base,
        });
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let encoding = self.encoding.as_mut().ok_or("FfmpegWriter: not opened")?;
        if frame.width() != self.width || frame.height() != self.height || frame.channels() != 3 {
            return Err(format!(
                "frame {} is {}x{}x{}, writer expects {}x{}x3",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.channels(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );
        let stride = rgb_frame.stride(0);
        let row_bytes = self.width as usize * 3;
        let dst = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_bytes).enumerate() {
            dst[row * stride..row * stride + row_bytes].copy_from_slice(src_row);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        encoding.scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoding.encoder.send_frame(&yuv_frame)?;
        encoding.drain()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(mut encoding) = self.encoding.take() {
            encoding.encoder.send_eof()?;
            encoding.drain()?;
            encoding.octx.write_trailer()?;
        }
        Ok(())
    }
}

impl Encoding {
    /// Moves every packet the encoder has ready into the container.
    fn drain(&mut self) -> Result<(), ffmpeg_next::Error> {
        let stream_time_base = self
            .octx
            .stream(0)
            .ok_or(ffmpeg_next::Error::StreamNotFound)?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(self.frame_time_base, stream_time_base);
            encoded.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}
