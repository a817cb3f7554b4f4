use std::ops::Range;
use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

type Decoded = Result<Frame, Box<dyn std::error::Error>>;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Each decoded frame is converted to RGB24 and wrapped in a [`Frame`]
/// indexed by its position in the stream. `read_range` seeks to the
/// keyframe before the range and decodes forward from there.
pub struct FfmpegReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
    fps: f64,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
            fps: 0.0,
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let decoder = video_decoder(&stream)?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames: match stream.frames() {
                n if n > 0 => n as usize,
                _ => estimate_frames(ictx.duration(), fps),
            },
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };
        log::debug!(
            "opened {}: {}x{} @ {:.2} fps, {} frames ({})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            metadata.codec
        );

        self.video_stream_index = stream.index();
        self.fps = fps;
        self.input_ctx = Some(ictx);

        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Decoded> + '_> {
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };
        match FfmpegFrameIter::new(ictx, self.video_stream_index) {
            Ok(iter) => Box::new(iter),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input_ctx = None;
    }

    fn read_range(&mut self, range: Range<usize>) -> Result<Vec<Frame>, Box<dyn std::error::Error>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let ictx = self.input_ctx.as_mut().ok_or("FfmpegReader: not opened")?;
        let clock = {
            let stream = ictx
                .stream(self.video_stream_index)
                .ok_or("video stream disappeared")?;
            StreamClock::of(&stream, self.fps)
        };

        // Without a usable clock, decode from the start and count frames.
        let clock = match clock {
            Some(clock) if range.start > 0 => {
                let target = (range.start as f64 / self.fps
                    * ffmpeg_next::ffi::AV_TIME_BASE as f64) as i64;
                match ictx.seek(target, ..target) {
                    Ok(()) => Some(clock),
                    Err(e) => {
                        log::debug!("seek to frame {} failed, decoding from start: {e}", range.start);
                        None
                    }
                }
            }
            _ => None,
        };

        let iter = FfmpegFrameIter::new(ictx, self.video_stream_index)?.starting_at(range.start, clock);
        let mut frames = Vec::with_capacity(range.len());
        for frame in iter {
            let frame = frame?;
            if frame.index() >= range.end {
                break;
            }
            frames.push(frame);
        }
        Ok(frames)
    }
}

/// Maps decoded timestamps back to frame positions.
#[derive(Clone, Copy, Debug)]
struct StreamClock {
    start: i64,
    secs_per_tick: f64,
    fps: f64,
}

impl StreamClock {
    fn of(stream: &ffmpeg_next::format::stream::Stream, fps: f64) -> Option<Self> {
        let time_base = stream.time_base();
        if fps <= 0.0 || time_base.numerator() <= 0 || time_base.denominator() <= 0 {
            return None;
        }
        let start = match stream.start_time() {
            ffmpeg_next::ffi::AV_NOPTS_VALUE => 0,
            t => t,
        };
        Some(Self {
            start,
            secs_per_tick: time_base.numerator() as f64 / time_base.denominator() as f64,
            fps,
        })
    }

    fn position(&self, timestamp: i64) -> usize {
        ((timestamp - self.start) as f64 * self.secs_per_tick * self.fps)
            .round()
            .max(0.0) as usize
    }
}

/// Frame count from the container duration (in `AV_TIME_BASE` units), for
/// streams that do not report one.
fn estimate_frames(duration: i64, fps: f64) -> usize {
    if duration <= 0 || fps <= 0.0 {
        return 0;
    }
    let secs = duration as f64 / ffmpeg_next::ffi::AV_TIME_BASE as f64;
    (secs * fps).round() as usize
}

fn video_decoder(
    stream: &ffmpeg_next::format::stream::Stream,
) -> Result<ffmpeg_next::decoder::Video, ffmpeg_next::Error> {
    ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
        .decoder()
        .video()
}

/// Lazy iterator that decodes video frames one at a time.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    /// Position of the next decoded frame when it carries no timestamp.
    frame_index: usize,
    /// Frames before this position are dropped before colour conversion.
    first_wanted: usize,
    clock: Option<StreamClock>,
    flushing: bool,
    done: bool,
}

impl<'a> FfmpegFrameIter<'a> {
    fn new(
        ictx: &'a mut ffmpeg_next::format::context::Input,
        video_stream_index: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let decoder = {
            let stream = ictx
                .stream(video_stream_index)
                .ok_or("video stream disappeared")?;
            video_decoder(&stream)?
        };
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg_next::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            video_stream_index,
            frame_index: 0,
            first_wanted: 0,
            clock: None,
            flushing: false,
            done: false,
        })
    }

    /// Skips frames before `first_wanted`. With a `clock`, positions come
    /// from frame timestamps, which keeps them right after a seek.
    fn starting_at(mut self, first_wanted: usize, clock: Option<StreamClock>) -> Self {
        self.first_wanted = first_wanted;
        self.clock = clock;
        self
    }

    fn position_of(&self, decoded: &ffmpeg_next::util::frame::video::Video) -> usize {
        match (self.clock, decoded.timestamp()) {
            (Some(clock), Some(ts)) => clock.position(ts),
            _ => self.frame_index,
        }
    }

    fn try_receive(&mut self) -> Option<Decoded> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        let index = loop {
            self.decoder.receive_frame(&mut decoded).ok()?;
            let index = self.position_of(&decoded);
            self.frame_index = index + 1;
            if index >= self.first_wanted {
                break index;
            }
        };

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(Box::new(e)));
        }
        let (width, height) = (rgb_frame.width(), rgb_frame.height());
        let pixels = packed_rgb(&rgb_frame, width, height);
        Some(Ok(Frame::new(pixels, width, height, 3, index)))
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Decoded;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(result) = self.try_receive() {
            return Some(result);
        }
        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                let last = self.try_receive();
                self.done = last.is_none();
                return last;
            };
            if stream.index() != self.video_stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("skipping undecodable packet: {e}");
                continue;
            }
            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Strips ffmpeg's per-row stride padding into a tightly packed RGB buffer.
fn packed_rgb(rgb_frame: &ffmpeg_next::util::frame::video::Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    (0..height as usize)
        .flat_map(|row| &data[row * stride..row * stride + row_bytes])
        .copied()
        .collect()
}
