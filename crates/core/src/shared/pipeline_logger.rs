use std::collections::HashMap;
use std::time::Instant;

/// Observer for tracking and dataset-building runs.
///
/// Keeps the tracker free of any particular output mechanism: the CLI
/// logs through the `log` crate, tests and batch workers stay silent.
pub trait PipelineLogger: Send {
    /// Report frame-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. boxes per detection).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logs progress every `throttle_frames` frames and keeps per-stage
/// timings and metrics for a summary at the end of the run.
pub struct LogPipelineLogger {
    label: String,
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    total_frames: usize,
}

impl LogPipelineLogger {
    /// `label` prefixes every line, typically the clip name.
    pub fn new(label: impl Into<String>, throttle_frames: usize) -> Self {
        Self {
            label: label.into(),
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            total_frames: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.total_frames;
        let mut lines = vec![format!(
            "[{}] tracking summary ({frames} frames, {:.1}s total):",
            self.label,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            lines.push(format!(
                "  {stage:10}: {calls:5} calls  avg {avg_ms:6.1}ms  total {total_ms:7.0}ms",
                calls = durations.len()
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            lines.push(format!("  {name}: avg {:.2}", mean(&self.metrics[name])));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_frames = total;
        if total > 0 && (current % self.throttle_frames == 0 || current == total) {
            log::info!("[{}] Tracking frame: {current} / {total}", self.label);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("[{}] {message}", self.label);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("detect", 5.0);
        logger.metric("detected_boxes", 2.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_per_stage() {
        let mut logger = LogPipelineLogger::new("clip", 10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("landmarks", 5.0);

        assert_eq!(logger.timings_for("detect").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("landmarks").unwrap(), &[5.0]);
        assert!(logger.timings_for("crop").is_none());
    }

    #[test]
    fn test_metric_records_values() {
        let mut logger = LogPipelineLogger::new("clip", 10);
        logger.metric("detected_boxes", 2.0);
        logger.metric("detected_boxes", 1.0);
        let values = logger.metrics_for("detected_boxes").unwrap();
        assert_relative_eq!(mean(values), 1.5);
    }

    #[test]
    fn test_summary_mentions_label_stages_and_metrics() {
        let mut logger = LogPipelineLogger::new("talk_0001-0008", 10);
        logger.progress(10, 10);
        logger.timing("detect", 20.0);
        logger.metric("frozen_frames", 1.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("talk_0001-0008"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("frozen_frames"));
        assert!(summary.contains("10 frames"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = LogPipelineLogger::new("clip", 10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_total() {
        let mut logger = LogPipelineLogger::new("clip", 4);
        for i in 1..=9 {
            logger.progress(i, 9);
        }
        assert_eq!(logger.total_frames, 9);
    }

    #[test]
    fn test_zero_throttle_is_clamped() {
        let logger = LogPipelineLogger::new("clip", 0);
        assert_eq!(logger.throttle_frames, 1);
    }
}
