use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;

use speaker_track_core::clip::domain::clip_window::ClipPlan;
use speaker_track_core::dataset::infrastructure::artifact_writer::ArtifactWriter;
use speaker_track_core::detection::infrastructure::model_resolver;
use speaker_track_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use speaker_track_core::detection::infrastructure::onnx_yolo_landmark_predictor::OnnxYoloLandmarkPredictor;
use speaker_track_core::pipeline::batch_executor::{BatchExecutor, SendError, UseCaseFactory};
use speaker_track_core::pipeline::build_clip_use_case::{
    unique_clip_names, BuildClipUseCase, ClipJob,
};
use speaker_track_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use speaker_track_core::shared::constants::{
    DEFAULT_CLIP_DURATION, DEFAULT_CLIP_START, DEFAULT_CONFIDENCE, DEFAULT_DETECT_EVERY,
    DEFAULT_HEAD_SCALE, DEFAULT_SPEAKERS, FACE_SIZE, VIDEO_EXTENSIONS, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use speaker_track_core::shared::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use speaker_track_core::tracking::domain::face_tracker::FaceTracker;
use speaker_track_core::tracking::domain::track_assigner::AssignmentPolicy;
use speaker_track_core::tracking::domain::tracker_config::TrackerConfig;
use speaker_track_core::video::domain::video_reader::VideoReader;
use speaker_track_core::video::domain::video_writer::VideoWriter;
use speaker_track_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use speaker_track_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Frames between progress lines in the log.
const PROGRESS_EVERY: usize = 25;

/// Builds per-speaker face-track datasets from talk videos.
#[derive(Parser)]
#[command(name = "speaker-track")]
struct Cli {
    /// Input video file, or a directory of videos.
    input: PathBuf,

    /// Dataset root; one directory per clip is created inside.
    output: PathBuf,

    /// Run the face detector every Nth frame (1 = every frame).
    #[arg(long, default_value_t = DEFAULT_DETECT_EVERY)]
    detect_every_n_frame: usize,

    /// Enlargement of detected face boxes into head regions.
    #[arg(long, default_value_t = DEFAULT_HEAD_SCALE)]
    scalar_face_detection: f64,

    /// Number of speakers to track per clip.
    #[arg(long, default_value_t = DEFAULT_SPEAKERS)]
    number_of_speakers: usize,

    /// Clip length in seconds.
    #[arg(long, default_value_t = DEFAULT_CLIP_DURATION)]
    duration: u32,

    /// Second at which the first clip starts.
    #[arg(long, default_value_t = DEFAULT_CLIP_START)]
    ss: u32,

    /// Treat each video as this many seconds long (0 = measure it).
    #[arg(long, default_value_t = 0)]
    max_length: u32,

    /// Track each input video as a single clip instead of splitting it.
    #[arg(long)]
    whole: bool,

    /// Match detections to speakers one-to-one instead of by independent
    /// best overlap.
    #[arg(long)]
    one_to_one: bool,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Clips processed in parallel; each worker loads its own models.
    #[arg(long, default_value = "1")]
    workers: usize,

    /// Directory checked for the face model before downloading it.
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = tracker_config(&cli);
    validate(&cli, &config)?;

    let sources = collect_sources(&cli.input)?;
    if sources.is_empty() {
        return Err(format!("No videos found in {}", cli.input.display()).into());
    }
    let jobs = plan_jobs(&cli, &sources)?;
    log::info!(
        "{} clips from {} videos, {} speakers each",
        jobs.len(),
        sources.len(),
        config.speakers
    );

    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        cli.model_dir.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    eprintln!();

    fs::create_dir_all(&cli.output)?;
    let factory = use_case_factory(model_path, cli.confidence, config, cli.output.clone());
    let executor = ThreadedBatchExecutor::new(cli.workers);
    let report = executor.execute(jobs, factory, Arc::new(AtomicBool::new(false)));

    for failure in &report.failed {
        log::warn!("{}: {}", failure.clip, failure.message);
    }
    log::info!(
        "{} clips written to {}, {} failed",
        report.completed.len(),
        cli.output.display(),
        report.failed.len()
    );

    if report.completed.is_empty() && !report.failed.is_empty() {
        return Err("every clip failed".into());
    }
    Ok(())
}

fn tracker_config(cli: &Cli) -> TrackerConfig {
    TrackerConfig {
        speakers: cli.number_of_speakers,
        detect_every: cli.detect_every_n_frame,
        head_scale: cli.scalar_face_detection,
        policy: if cli.one_to_one {
            AssignmentPolicy::OneToOne
        } else {
            AssignmentPolicy::IndependentArgmax
        },
        face_size: FACE_SIZE,
    }
}

fn validate(cli: &Cli, config: &TrackerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.duration == 0 {
        return Err("Duration must be at least 1 second".into());
    }
    if cli.workers == 0 {
        return Err("At least one worker is required".into());
    }
    config.validate()?;
    Ok(())
}

/// The input itself if it is a file, else the videos directly inside it,
/// sorted by name.
fn collect_sources(input: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut sources = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_file() && is_video(&path) {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn plan_jobs(cli: &Cli, sources: &[PathBuf]) -> Result<Vec<ClipJob>, Box<dyn std::error::Error>> {
    if cli.whole {
        let jobs = sources.iter().map(|s| ClipJob::whole(s)).collect();
        return Ok(unique_clip_names(jobs)?);
    }

    let plan = ClipPlan {
        start: cli.ss,
        duration: cli.duration,
        max_length: (cli.max_length > 0).then_some(cli.max_length),
    };
    let mut reader = FfmpegReader::new();
    let mut jobs = Vec::new();
    for source in sources {
        let secs = match reader.open(source) {
            Ok(metadata) => metadata.duration_secs(),
            Err(e) => {
                log::warn!("Skipping {}: {e}", source.display());
                continue;
            }
        };
        reader.close();
        let windows = plan.windows(secs)?;
        log::debug!("{}: {secs:.1}s, {} clips", source.display(), windows.len());
        jobs.extend(windows.into_iter().map(|w| ClipJob::windowed(source, w)));
    }
    Ok(unique_clip_names(jobs)?)
}

fn use_case_factory(
    model_path: PathBuf,
    confidence: f64,
    config: TrackerConfig,
    output: PathBuf,
) -> UseCaseFactory {
    Arc::new(move || -> Result<BuildClipUseCase, SendError> {
        let detector = OnnxYoloDetector::new(&model_path, confidence).map_err(to_send)?;
        let predictor = OnnxYoloLandmarkPredictor::new(&model_path, confidence).map_err(to_send)?;
        let tracker = FaceTracker::new(Box::new(detector), Box::new(predictor), &config)
            .map_err(|e| to_send(e.into()))?;
        let artifacts = ArtifactWriter::new(Box::new(|| {
            Box::new(FfmpegWriter::new()) as Box<dyn VideoWriter>
        }));

        Ok(
            BuildClipUseCase::new(Box::new(FfmpegReader::new()), tracker, artifacts, &output)
                .with_logger_factory(Box::new(|clip: &str| {
                    Box::new(LogPipelineLogger::new(clip, PROGRESS_EVERY)) as Box<dyn PipelineLogger>
                })),
        )
    })
}

fn to_send(e: Box<dyn std::error::Error>) -> SendError {
    e.to_string().into()
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face model... {pct}%");
    } else {
        eprint!("\rDownloading face model... {downloaded} bytes");
    }
}
