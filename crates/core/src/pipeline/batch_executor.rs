use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::build_clip_use_case::{BuildClipUseCase, ClipJob, ClipReport};

pub type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Builds one use case per worker; each worker owns its own models.
pub type UseCaseFactory = Arc<dyn Fn() -> Result<BuildClipUseCase, SendError> + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobFailure {
    pub clip: String,
    pub message: String,
}

/// Outcome of a batch: one entry per job, in completion order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<ClipReport>,
    pub failed: Vec<JobFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

/// Runs independent clip jobs. A failing job never stops the batch.
///
/// Setting `cancelled` stops workers from picking up further jobs; jobs
/// that never ran are absent from the report.
pub trait BatchExecutor: Send {
    fn execute(
        &self,
        jobs: Vec<ClipJob>,
        factory: UseCaseFactory,
        cancelled: Arc<AtomicBool>,
    ) -> BatchReport;
}
