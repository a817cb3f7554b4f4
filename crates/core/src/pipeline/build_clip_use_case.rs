use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::clip::domain::clip_window::ClipWindow;
use crate::dataset::domain::dataset_error::DatasetError;
use crate::dataset::domain::dataset_layout::DatasetLayout;
use crate::dataset::infrastructure::artifact_writer::ArtifactWriter;
use crate::shared::frame::Frame;
use crate::shared::pipeline_logger::PipelineLogger;
use crate::tracking::domain::face_tracker::FaceTracker;
use crate::video::domain::video_reader::VideoReader;

/// Builds a per-clip logger from the clip name.
pub type LoggerFactory = Box<dyn Fn(&str) -> Box<dyn PipelineLogger> + Send>;

/// One unit of dataset work: a span of a source video and the name its
/// artifacts are written under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipJob {
    pub source: PathBuf,
    /// `None` takes the whole video.
    pub window: Option<ClipWindow>,
    pub name: String,
}

impl ClipJob {
    /// A job for `window` of `source`, named after the file stem.
    pub fn windowed(source: &Path, window: ClipWindow) -> Self {
        Self {
            source: source.to_path_buf(),
            window: Some(window),
            name: window.name(&file_stem(source)),
        }
    }

    /// A job for all of `source`, named after the file stem.
    pub fn whole(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            window: None,
            name: file_stem(source),
        }
    }

    /// Same job, with the source extension folded into the name
    /// (`talk_mov_0001-0008`).
    fn with_extension_in_name(mut self) -> Self {
        let Some(ext) = self.source.extension() else {
            return self;
        };
        let label = format!("{}_{}", file_stem(&self.source), ext.to_string_lossy());
        self.name = match self.window {
            Some(window) => window.name(&label),
            None => label,
        };
        self
    }
}

/// Gives every job its own clip directory.
///
/// When sources share a stem (`talk.mp4`, `talk.mov`), every job of those
/// sources gets the extension added to its name. A collision that survives
/// the rename is an error.
pub fn unique_clip_names(jobs: Vec<ClipJob>) -> Result<Vec<ClipJob>, DatasetError> {
    let mut sources_per_name: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for job in &jobs {
        let sources = sources_per_name.entry(job.name.clone()).or_default();
        if !sources.contains(&job.source) {
            sources.push(job.source.clone());
        }
    }

    let clashing: HashSet<PathBuf> = sources_per_name
        .into_values()
        .filter(|sources| sources.len() > 1)
        .flatten()
        .collect();

    let renamed: Vec<ClipJob> = jobs
        .into_iter()
        .map(|job| {
            if clashing.contains(&job.source) {
                job.with_extension_in_name()
            } else {
                job
            }
        })
        .collect();

    let mut owners: HashMap<&str, &Path> = HashMap::new();
    for job in &renamed {
        if let Some(first) = owners.insert(job.name.as_str(), job.source.as_path()) {
            if first != job.source.as_path() {
                return Err(DatasetError::DuplicateClip {
                    clip: job.name.clone(),
                    first: first.to_path_buf(),
                    second: job.source.clone(),
                });
            }
        }
    }
    Ok(renamed)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string())
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClipReport {
    pub clip: String,
    pub frames: usize,
    pub speakers: usize,
    /// Per speaker, fraction of frames whose crop had visible landmarks.
    pub landmark_coverage: Vec<f64>,
}

/// Reads a clip, tracks its speakers and writes the dataset artifacts.
///
/// Reusable across jobs: the tracker keeps no state between runs. A failed
/// job leaves no clip directory behind.
pub struct BuildClipUseCase {
    reader: Box<dyn VideoReader>,
    tracker: FaceTracker,
    artifacts: ArtifactWriter,
    output_root: PathBuf,
    logger_factory: Option<LoggerFactory>,
}

impl BuildClipUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        tracker: FaceTracker,
        artifacts: ArtifactWriter,
        output_root: &Path,
    ) -> Self {
        Self {
            reader,
            tracker,
            artifacts,
            output_root: output_root.to_path_buf(),
            logger_factory: None,
        }
    }

    pub fn with_logger_factory(mut self, factory: LoggerFactory) -> Self {
        self.logger_factory = Some(factory);
        self
    }

    pub fn execute(&mut self, job: &ClipJob) -> Result<ClipReport, DatasetError> {
        let layout = DatasetLayout::new(&self.output_root, &job.name);
        let result = self.run(job, &layout);

        if let Err(e) = &result {
            log::error!("{} in {}", e, layout.clip_dir().display());
            remove_clip_dir(layout.clip_dir());
        }
        result
    }

    fn run(&mut self, job: &ClipJob, layout: &DatasetLayout) -> Result<ClipReport, DatasetError> {
        let frames = self.read_frames(job)?;
        if frames.is_empty() {
            return Err(DatasetError::EmptyClip {
                clip: job.name.clone(),
            });
        }

        if let Some(factory) = &self.logger_factory {
            self.tracker.set_logger(factory(&job.name));
        }
        let tracks = self.tracker.track(&frames)?;
        self.artifacts.write_clip(layout, &frames, &tracks)?;

        Ok(ClipReport {
            clip: job.name.clone(),
            frames: frames.len(),
            speakers: tracks.len(),
            landmark_coverage: tracks.iter().map(|t| t.landmark_coverage()).collect(),
        })
    }

    fn read_frames(&mut self, job: &ClipJob) -> Result<Vec<Frame>, DatasetError> {
        let read_error = |source| DatasetError::Read {
            path: job.source.clone(),
            source,
        };

        let metadata = self.reader.open(&job.source).map_err(read_error)?;
        let frames = match job.window {
            Some(window) => {
                let range = window.frame_range(metadata.fps);
                log::info!(
                    "{}: frames {}..{} of {}",
                    job.name,
                    range.start,
                    range.end,
                    job.source.display()
                );
                self.reader.read_range(range)
            }
            None => self.reader.frames().collect(),
        };
        self.reader.close();
        frames.map_err(read_error)
    }
}

fn remove_clip_dir(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Ok(()) => log::info!("deleted {}", dir.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("could not delete {}: {e}", dir.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::detection::domain::face_detector::FaceDetector;
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::detection::domain::landmark_predictor::LandmarkPredictor;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::tracking::domain::tracker_config::TrackerConfig;
    use crate::video::domain::video_writer::VideoWriter;

    // --- Stubs ---

    struct StubReader {
        count: usize,
        fps: f64,
        fail_open: bool,
        closed: Arc<Mutex<bool>>,
    }

    impl VideoReader for StubReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err(format!("cannot open {}", path.display()).into());
            }
            Ok(VideoMetadata {
                width: 96,
                height: 64,
                fps: self.fps,
                total_frames: self.count,
                codec: "stub".to_string(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new((0..self.count).map(|i| Ok(Frame::new(vec![50u8; 96 * 64 * 3], 96, 64, 3, i))))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    struct FixedDetector(Vec<BoundingBox>);

    impl FaceDetector for FixedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct CenterPredictor;

    impl LandmarkPredictor for CenterPredictor {
        fn predict(
            &mut self,
            face: &Frame,
        ) -> Result<Option<FaceLandmarks>, Box<dyn std::error::Error>> {
            let c = face.width() as f64 / 2.0;
            Ok(Some(FaceLandmarks::from_visible(vec![(c, c)])))
        }
    }

    /// Counts written frames without touching an encoder.
    struct NullWriter;

    impl VideoWriter for NullWriter {
        fn open(&mut self, path: &Path, _m: &VideoMetadata) -> Result<(), Box<dyn std::error::Error>> {
            std::fs::write(path, b"stub")?;
            Ok(())
        }
        fn write(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    // --- Helpers ---

    fn use_case(reader: StubReader, detector: FixedDetector, root: &Path) -> BuildClipUseCase {
        let config = TrackerConfig {
            detect_every: 2,
            face_size: 32,
            ..TrackerConfig::default()
        };
        let tracker =
            FaceTracker::new(Box::new(detector), Box::new(CenterPredictor), &config).unwrap();
        let artifacts = ArtifactWriter::new(Box::new(|| Box::new(NullWriter) as Box<dyn VideoWriter>));
        BuildClipUseCase::new(Box::new(reader), tracker, artifacts, root)
    }

    fn reader(count: usize, fps: f64) -> StubReader {
        StubReader {
            count,
            fps,
            fail_open: false,
            closed: Arc::new(Mutex::new(false)),
        }
    }

    fn two_faces() -> FixedDetector {
        FixedDetector(vec![
            BoundingBox::new(10.0, 10.0, 30.0, 30.0),
            BoundingBox::new(60.0, 10.0, 80.0, 30.0),
        ])
    }

    // --- Tests ---

    #[test]
    fn test_job_names() {
        let source = Path::new("/videos/panel talk.mp4");
        assert_eq!(
            ClipJob::windowed(source, ClipWindow { start: 8, end: 15 }).name,
            "panel talk_0008-0015"
        );
        assert_eq!(ClipJob::whole(source).name, "panel talk");
    }

    #[test]
    fn test_same_stem_sources_get_distinct_clip_names() {
        let window = ClipWindow { start: 1, end: 8 };
        let jobs = vec![
            ClipJob::windowed(Path::new("/in/talk.mov"), window),
            ClipJob::windowed(Path::new("/in/talk.mp4"), window),
            ClipJob::windowed(Path::new("/in/talk.mp4"), ClipWindow { start: 8, end: 15 }),
            ClipJob::windowed(Path::new("/in/panel.mp4"), window),
        ];

        let names: Vec<String> = unique_clip_names(jobs)
            .unwrap()
            .into_iter()
            .map(|j| j.name)
            .collect();

        assert_eq!(
            names,
            vec![
                "talk_mov_0001-0008",
                "talk_mp4_0001-0008",
                "talk_mp4_0008-0015",
                "panel_0001-0008",
            ]
        );
    }

    #[test]
    fn test_whole_jobs_with_same_stem_get_extension() {
        let jobs = vec![
            ClipJob::whole(Path::new("/in/talk.mp4")),
            ClipJob::whole(Path::new("/in/talk.mkv")),
        ];
        let names: Vec<String> = unique_clip_names(jobs)
            .unwrap()
            .into_iter()
            .map(|j| j.name)
            .collect();
        assert_eq!(names, vec!["talk_mp4", "talk_mkv"]);
    }

    #[test]
    fn test_unresolvable_clip_name_collision_is_rejected() {
        // "a/talk.mp4" and "b/talk.mp4" still share "talk_mp4" after renaming
        let jobs = vec![
            ClipJob::whole(Path::new("/a/talk.mp4")),
            ClipJob::whole(Path::new("/b/talk.mp4")),
        ];
        match unique_clip_names(jobs) {
            Err(DatasetError::DuplicateClip { clip, first, second }) => {
                assert_eq!(clip, "talk_mp4");
                assert_eq!(first, PathBuf::from("/a/talk.mp4"));
                assert_eq!(second, PathBuf::from("/b/talk.mp4"));
            }
            other => panic!("expected DuplicateClip, got {other:?}"),
        }
    }

    #[test]
    fn test_distinct_names_are_left_alone() {
        let jobs = vec![
            ClipJob::whole(Path::new("/in/talk.mp4")),
            ClipJob::whole(Path::new("/in/panel.mp4")),
        ];
        assert_eq!(unique_clip_names(jobs.clone()).unwrap(), jobs);
    }

    #[test]
    fn test_windowed_job_tracks_only_its_frames() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = reader(100, 4.0);
        let closed = stub.closed.clone();
        let mut uc = use_case(stub, two_faces(), tmp.path());
        let job = ClipJob::windowed(Path::new("/v/talk.mp4"), ClipWindow { start: 1, end: 8 });

        let report = uc.execute(&job).unwrap();

        assert_eq!(report.clip, "talk_0001-0008");
        assert_eq!(report.frames, 28);
        assert_eq!(report.speakers, 2);
        assert_eq!(report.landmark_coverage, vec![1.0, 1.0]);
        assert!(*closed.lock().unwrap());

        let layout = DatasetLayout::new(tmp.path(), "talk_0001-0008");
        assert!(layout.face_video(1).exists());
        assert!(layout.tracked_video(0).exists());
        assert!(layout.landmark_file(0).exists());
        assert!(layout.manifest().exists());
    }

    #[test]
    fn test_whole_job_reads_every_frame() {
        let tmp = tempfile::tempdir().unwrap();
        let mut uc = use_case(reader(5, 25.0), two_faces(), tmp.path());

        let report = uc.execute(&ClipJob::whole(Path::new("/v/talk.mp4"))).unwrap();

        assert_eq!(report.frames, 5);
    }

    #[test]
    fn test_tracking_failure_removes_clip_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let one_face = FixedDetector(vec![BoundingBox::new(10.0, 10.0, 30.0, 30.0)]);
        let mut uc = use_case(reader(5, 25.0), one_face, tmp.path());
        let job = ClipJob::whole(Path::new("/v/talk.mp4"));
        std::fs::create_dir_all(tmp.path().join("talk").join("faces")).unwrap();

        let err = uc.execute(&job).unwrap_err();

        assert!(matches!(err, DatasetError::Track(_)));
        assert!(!tmp.path().join("talk").exists());
    }

    #[test]
    fn test_window_past_end_is_empty_clip() {
        let tmp = tempfile::tempdir().unwrap();
        let mut uc = use_case(reader(10, 25.0), two_faces(), tmp.path());
        let job = ClipJob::windowed(Path::new("/v/talk.mp4"), ClipWindow { start: 8, end: 15 });

        assert!(matches!(uc.execute(&job), Err(DatasetError::EmptyClip { .. })));
    }

    #[test]
    fn test_unreadable_source_is_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut stub = reader(10, 25.0);
        stub.fail_open = true;
        let mut uc = use_case(stub, two_faces(), tmp.path());

        let err = uc.execute(&ClipJob::whole(Path::new("/v/missing.mp4"))).unwrap_err();

        match err {
            DatasetError::Read { path, .. } => assert_eq!(path, Path::new("/v/missing.mp4")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_logger_factory_receives_clip_name() {
        use crate::shared::pipeline_logger::NullPipelineLogger;

        let tmp = tempfile::tempdir().unwrap();
        let names = Arc::new(Mutex::new(Vec::new()));
        let seen = names.clone();
        let mut uc = use_case(reader(3, 25.0), two_faces(), tmp.path()).with_logger_factory(
            Box::new(move |name: &str| {
                seen.lock().unwrap().push(name.to_string());
                Box::new(NullPipelineLogger) as Box<dyn PipelineLogger>
            }),
        );

        uc.execute(&ClipJob::whole(Path::new("/v/talk.mp4"))).unwrap();

        assert_eq!(*names.lock().unwrap(), vec!["talk".to_string()]);
    }
}
