use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dataset::domain::dataset_error::DatasetError;
use crate::dataset::domain::dataset_layout::{manifest_contents, DatasetLayout};
use crate::shared::constants::OUTPUT_FPS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::tracking::domain::track::Track;
use crate::video::domain::box_overlay::with_box_outline;
use crate::video::domain::video_writer::VideoWriter;

/// Builds a fresh, unopened video writer for each output file.
pub type WriterFactory = Box<dyn Fn() -> Box<dyn VideoWriter> + Send>;

/// Writes a tracked clip to disk in the dataset layout.
pub struct ArtifactWriter {
    new_writer: WriterFactory,
    fps: f64,
}

impl ArtifactWriter {
    pub fn new(new_writer: WriterFactory) -> Self {
        Self {
            new_writer,
            fps: OUTPUT_FPS,
        }
    }

    /// Writes every artifact for `tracks`, which were tracked over `frames`.
    ///
    /// Stops at the first failure; cleaning up the clip directory is left
    /// to the caller.
    pub fn write_clip(
        &self,
        layout: &DatasetLayout,
        frames: &[Frame],
        tracks: &[Track],
    ) -> Result<(), DatasetError> {
        for dir in [
            layout.clip_dir().to_path_buf(),
            layout.faces_dir(),
            layout.landmark_dir(),
            layout.manifest_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|source| DatasetError::Io { path: dir, source })?;
        }

        for track in tracks {
            let annotated = frames
                .iter()
                .zip(track.boxes())
                .map(|(frame, bbox)| with_box_outline(frame, bbox));
            self.write_video(&layout.tracked_video(track.id()), annotated)?;
        }

        for track in tracks {
            write_landmarks(&layout.landmark_file(track.id()), track)?;
            self.write_video(&layout.face_video(track.id()), track.faces().iter().cloned())?;
        }

        let manifest = layout.manifest();
        fs::write(&manifest, manifest_contents(tracks.len()))
            .map_err(|source| DatasetError::Io {
                path: manifest,
                source,
            })?;

        log::debug!("wrote {} speaker tracks for {}", tracks.len(), layout.clip());
        Ok(())
    }

    fn write_video(
        &self,
        path: &Path,
        mut frames: impl Iterator<Item = Frame>,
    ) -> Result<(), DatasetError> {
        let video_error = |source| DatasetError::Video {
            path: path.to_path_buf(),
            source,
        };

        let Some(first) = frames.next() else {
            return Ok(());
        };
        let mut writer = (self.new_writer)();
        writer
            .open(
                path,
                &VideoMetadata::for_output(first.width(), first.height(), self.fps),
            )
            .map_err(video_error)?;

        let written = std::iter::once(first)
            .chain(frames)
            .try_for_each(|frame| writer.write(&frame));
        let closed = writer.close();
        written.and(closed).map_err(video_error)
    }
}

fn write_landmarks(path: &Path, track: &Track) -> Result<(), DatasetError> {
    let file = fs::File::create(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer(&mut out, track.landmarks()).map_err(|source| {
        DatasetError::Landmarks {
            path: path.to_path_buf(),
            source,
        }
    })?;
    out.flush().map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}
