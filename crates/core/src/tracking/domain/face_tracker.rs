use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::landmark_predictor::LandmarkPredictor;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::tracking::domain::detection_schedule::DetectionSchedule;
use crate::tracking::domain::face_crop::crop_face;
use crate::tracking::domain::track::Track;
use crate::tracking::domain::track_assigner::{Resolution, ResolutionKind, TrackAssigner};
use crate::tracking::domain::track_error::TrackError;
use crate::tracking::domain::tracker_config::TrackerConfig;
use crate::tracking::domain::tracker_state::TrackerState;

/// Tracks up to N speaker faces through a frame sequence.
///
/// Each frame either runs the detector or reuses the previous boxes, the
/// boxes are resolved to speaker slots, and every slot gets a 224x224 face
/// crop, its landmarks, and its box. Frames are folded strictly in order:
/// frame i+1 is resolved against the boxes of frame i.
pub struct FaceTracker {
    detector: Box<dyn FaceDetector>,
    predictor: Box<dyn LandmarkPredictor>,
    schedule: DetectionSchedule,
    assigner: TrackAssigner,
    face_size: u32,
    logger: Box<dyn PipelineLogger>,
}

impl FaceTracker {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        predictor: Box<dyn LandmarkPredictor>,
        config: &TrackerConfig,
    ) -> Result<Self, TrackError> {
        config.validate()?;
        Ok(Self {
            detector,
            predictor,
            schedule: DetectionSchedule::new(config.detect_every)?,
            assigner: TrackAssigner::new(config.speakers, config.head_scale, config.policy),
            face_size: config.face_size,
            logger: Box::new(NullPipelineLogger),
        })
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.set_logger(logger);
        self
    }

    /// Replaces the logger used by subsequent runs.
    pub fn set_logger(&mut self, logger: Box<dyn PipelineLogger>) {
        self.logger = logger;
    }

    pub fn speakers(&self) -> usize {
        self.assigner.speakers()
    }

    /// Runs the tracker over `frames` and returns one finished track per
    /// speaker slot, each holding exactly `frames.len()` entries.
    ///
    /// Any detector or landmark failure aborts the whole run; no partial
    /// tracks are returned.
    pub fn track(&mut self, frames: &[Frame]) -> Result<Vec<Track>, TrackError> {
        if frames.is_empty() {
            return Err(TrackError::EmptySequence);
        }

        let total = frames.len();
        self.logger.info(&format!(
            "Tracking {} speakers over {total} frames ({} detector passes, {:?})",
            self.speakers(),
            self.schedule.passes(total),
            self.assigner.policy()
        ));

        let state = frames
            .iter()
            .try_fold(TrackerState::new(self.speakers()), |state, frame| {
                let state = self.step(state, frame)?;
                self.logger.progress(state.frames_processed(), total);
                Ok::<_, TrackError>(state)
            })?;

        self.logger.summary();
        Ok(state.into_tracks())
    }

    /// Advances `state` by one frame.
    ///
    /// The frame's position in the sequence is the number of frames the
    /// state has already absorbed. `state` must hold one track per speaker.
    pub fn step(&mut self, mut state: TrackerState, frame: &Frame) -> Result<TrackerState, TrackError> {
        if state.tracks().len() != self.speakers() {
            return Err(TrackError::StateMismatch {
                tracks: state.tracks().len(),
                speakers: self.speakers(),
            });
        }
        let position = state.frames_processed();
        let previous = state.last_boxes();

        let resolution = if self.schedule.should_detect(position) {
            let resolution = self.detect_and_assign(position, frame, previous.as_deref())?;
            match resolution.kind {
                ResolutionKind::Frozen => self.logger.metric("missed_detections", 1.0),
                _ => {
                    state.record_detection(position);
                    self.logger.metric("missed_detections", 0.0);
                }
            }
            resolution
        } else {
            let prev = previous.ok_or(TrackError::FirstFrameMiss {
                found: 0,
                expected: self.speakers(),
            })?;
            TrackAssigner::freeze(&prev)
        };

        let mut entries = Vec::with_capacity(resolution.boxes.len());
        for (slot, bbox) in resolution.boxes.into_iter().enumerate() {
            let face = crop_face(frame, &bbox, self.face_size)?;

            let started = Instant::now();
            let landmarks = self
                .predictor
                .predict(&face)
                .map_err(|source| TrackError::Landmarks {
                    frame: position,
                    slot,
                    source,
                })?;
            self.logger
                .timing("landmarks", started.elapsed().as_secs_f64() * 1000.0);

            entries.push((face, landmarks, bbox));
        }
        state.append(entries)?;

        Ok(state)
    }

    fn detect_and_assign(
        &mut self,
        position: usize,
        frame: &Frame,
        previous: Option<&[BoundingBox]>,
    ) -> Result<Resolution, TrackError> {
        let started = Instant::now();
        let mut boxes = self
            .detector
            .detect(frame)
            .map_err(|source| TrackError::Detector {
                frame: position,
                source,
            })?;
        self.logger
            .timing("detect", started.elapsed().as_secs_f64() * 1000.0);

        let raw_count = boxes.len();
        boxes.retain(|b| b.is_valid());
        if boxes.len() < raw_count {
            log::debug!(
                "frame {position}: dropped {} degenerate boxes",
                raw_count - boxes.len()
            );
        }
        boxes.truncate(self.speakers());
        self.logger.metric("detected_boxes", boxes.len() as f64);

        self.assigner.assign(&boxes, previous)
    }
}
