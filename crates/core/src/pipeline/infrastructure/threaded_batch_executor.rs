use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::pipeline::batch_executor::{
    BatchExecutor, BatchReport, JobFailure, UseCaseFactory,
};
use crate::pipeline::build_clip_use_case::{ClipJob, ClipReport};

type JobResult = Result<ClipReport, JobFailure>;

/// Fans clip jobs out to a fixed pool of worker threads.
///
/// Layout: `main [queue jobs] → workers [track + write] → main [collect]`
pub struct ThreadedBatchExecutor {
    workers: usize,
}

impl ThreadedBatchExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedBatchExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl BatchExecutor for ThreadedBatchExecutor {
    fn execute(
        &self,
        jobs: Vec<ClipJob>,
        factory: UseCaseFactory,
        cancelled: Arc<AtomicBool>,
    ) -> BatchReport {
        let total = jobs.len();
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<ClipJob>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<JobResult>();
        for job in jobs {
            // receiver is alive until the workers exit
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let handles: Vec<_> = (0..self.workers.min(total.max(1)))
            .map(|worker| {
                spawn_worker(
                    worker,
                    job_rx.clone(),
                    result_tx.clone(),
                    factory.clone(),
                    cancelled.clone(),
                )
            })
            .collect();
        drop(result_tx);

        let mut report = BatchReport::default();
        for result in result_rx {
            match result {
                Ok(done) => report.completed.push(done),
                Err(failure) => report.failed.push(failure),
            }
            log::info!("Clips: {} / {total}", report.total());
        }

        for (worker, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() {
                log::error!("worker {worker} panicked");
            }
        }
        report
    }
}

fn spawn_worker(
    worker: usize,
    job_rx: crossbeam_channel::Receiver<ClipJob>,
    result_tx: crossbeam_channel::Sender<JobResult>,
    factory: UseCaseFactory,
    cancelled: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut use_case = match factory() {
            Ok(use_case) => Some(use_case),
            Err(e) => {
                log::error!("worker {worker} could not start: {e}");
                None
            }
        };
        let setup_error = |clip: String| JobFailure {
            clip,
            message: "worker failed to initialize".to_string(),
        };

        for job in job_rx {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let result = match use_case.as_mut() {
                Some(use_case) => use_case.execute(&job).map_err(|e| JobFailure {
                    clip: job.name.clone(),
                    message: e.to_string(),
                }),
                None => Err(setup_error(job.name.clone())),
            };
            if result_tx.send(result).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    use crate::dataset::infrastructure::artifact_writer::ArtifactWriter;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::detection::domain::landmark_predictor::LandmarkPredictor;
    use crate::pipeline::batch_executor::SendError;
    use crate::pipeline::build_clip_use_case::BuildClipUseCase;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::frame::Frame;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::tracking::domain::face_tracker::FaceTracker;
    use crate::tracking::domain::tracker_config::TrackerConfig;
    use crate::video::domain::video_reader::VideoReader;
    use crate::video::domain::video_writer::VideoWriter;

    // --- Stubs ---

    /// Serves a short clip for any path except ones containing "broken".
    struct StubReader {
        broken: bool,
    }

    impl VideoReader for StubReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            self.broken = path.to_string_lossy().contains("broken");
            if self.broken {
                return Err("corrupt container".into());
            }
            Ok(VideoMetadata::for_output(64, 64, 25.0))
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new((0..4).map(|i| Ok(Frame::new(vec![0u8; 64 * 64 * 3], 64, 64, 3, i))))
        }

        fn close(&mut self) {}
    }

    struct OneFace;

    impl FaceDetector for OneFace {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(vec![BoundingBox::new(16.0, 16.0, 48.0, 48.0)])
        }
    }

    struct NoLandmarks;

    impl LandmarkPredictor for NoLandmarks {
        fn predict(&mut self, _face: &Frame) -> Result<Option<FaceLandmarks>, Box<dyn std::error::Error>> {
            Ok(None)
        }
    }

    struct DiscardWriter;

    impl VideoWriter for DiscardWriter {
        fn open(&mut self, _p: &Path, _m: &VideoMetadata) -> Result<(), Box<dyn std::error::Error>> {
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

    fn factory(root: &Path, builds: Arc<AtomicUsize>) -> UseCaseFactory {
        let root = root.to_path_buf();
        Arc::new(move || -> Result<BuildClipUseCase, SendError> {
            builds.fetch_add(1, Ordering::SeqCst);
            let config = TrackerConfig {
                speakers: 1,
                face_size: 16,
                ..TrackerConfig::default()
            };
            let tracker = FaceTracker::new(Box::new(OneFace), Box::new(NoLandmarks), &config)
                .map_err(|e| -> SendError { e.to_string().into() })?;
            Ok(BuildClipUseCase::new(
                Box::new(StubReader { broken: false }),
                tracker,
                ArtifactWriter::new(Box::new(|| Box::new(DiscardWriter) as Box<dyn VideoWriter>)),
                &root,
            ))
        })
    }

    fn jobs(names: &[&str]) -> Vec<ClipJob> {
        names
            .iter()
            .map(|n| ClipJob::whole(Path::new(&format!("/videos/{n}.mp4"))))
            .collect()
    }

    // --- Tests ---

    #[test]
    fn test_runs_every_job() {
        let tmp = tempfile::tempdir().unwrap();
        let builds = Arc::new(AtomicUsize::new(0));
        let executor = ThreadedBatchExecutor::new(3);

        let report = executor.execute(
            jobs(&["a", "b", "c", "d", "e"]),
            factory(tmp.path(), builds.clone()),
            Arc::new(AtomicBool::new(false)),
        );

        assert_eq!(report.completed.len(), 5);
        assert!(report.failed.is_empty());
        let mut clips: Vec<_> = report.completed.iter().map(|r| r.clip.as_str()).collect();
        clips.sort();
        assert_eq!(clips, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(builds.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failures_are_collected_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = ThreadedBatchExecutor::new(2);

        let report = executor.execute(
            jobs(&["a", "broken", "c"]),
            factory(tmp.path(), Arc::new(AtomicUsize::new(0))),
            Arc::new(AtomicBool::new(false)),
        );

        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].clip, "broken");
        assert!(report.failed[0].message.contains("corrupt container"));
        assert!(!tmp.path().join("broken").exists());
    }

    #[test]
    fn test_worker_setup_failure_fails_its_jobs() {
        let executor = ThreadedBatchExecutor::new(1);
        let failing: UseCaseFactory =
            Arc::new(|| -> Result<BuildClipUseCase, SendError> { Err("model missing".into()) });

        let report = executor.execute(jobs(&["a", "b"]), failing, Arc::new(AtomicBool::new(false)));

        assert!(report.completed.is_empty());
        assert_eq!(report.failed.len(), 2);
    }

    #[test]
    fn test_cancelled_batch_runs_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = ThreadedBatchExecutor::new(2);

        let report = executor.execute(
            jobs(&["a", "b"]),
            factory(tmp.path(), Arc::new(AtomicUsize::new(0))),
            Arc::new(AtomicBool::new(true)),
        );

        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_empty_batch() {
        let executor = ThreadedBatchExecutor::default();
        let report = executor.execute(
            Vec::new(),
            Arc::new(|| -> Result<BuildClipUseCase, SendError> { Err("unused".into()) }),
            Arc::new(AtomicBool::new(false)),
        );
        assert_eq!(report.total(), 0);
        assert_eq!(executor.workers(), 1);
    }
}
