pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Default number of speaker slots tracked per clip.
pub const DEFAULT_SPEAKERS: usize = 2;

/// Default frames between full detector passes.
pub const DEFAULT_DETECT_EVERY: usize = 8;

/// Default minimum face confidence for the detector and landmark model.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Default head-region enlargement applied to detector boxes.
pub const DEFAULT_HEAD_SCALE: f64 = 1.5;

/// Side of the square face canvas every crop is resized to.
pub const FACE_SIZE: u32 = 224;

/// Frame rate of every written face and preview video.
pub const OUTPUT_FPS: f64 = 25.0;

/// Clip segmentation defaults, in seconds.
pub const DEFAULT_CLIP_DURATION: u32 = 7;
pub const DEFAULT_CLIP_START: u32 = 1;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm"];
