//! Execution context shared by all stages of one job.

use reelforge_av::{ArtifactDir, MediaToolchain};
use reelforge_common::{AssemblyJob, AssemblyOptions, JobId};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sender for reporting progress from within stages.
///
/// Wraps a callback that receives a progress percentage (0 to 100) and a
/// human-readable step description.
pub struct ProgressSender {
    callback: Box<dyn Fn(u8, &str) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(u8, &str) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_, _| {}),
        }
    }

    /// Report progress.
    pub fn send(&self, progress: u8, step: &str) {
        (self.callback)(progress, step);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// Context passed to every stage of a job.
pub struct StageContext {
    pub job_id: JobId,
    pub options: AssemblyOptions,
    /// Caption text aligned by index to the job's input segments.
    pub captions: Vec<Option<String>>,
    pub toolchain: Arc<dyn MediaToolchain>,
    pub artifacts: Arc<ArtifactDir>,
    /// Cancelled when a newer job supersedes this one.
    pub cancellation: CancellationToken,
    pub progress: Arc<ProgressSender>,
}

impl StageContext {
    /// Create a context for `job` with no cancellation and no progress sink.
    pub fn new(
        job: &AssemblyJob,
        toolchain: Arc<dyn MediaToolchain>,
        artifacts: Arc<ArtifactDir>,
    ) -> Self {
        Self {
            job_id: job.id,
            options: job.options.clone(),
            captions: job.caption_source.clone(),
            toolchain,
            artifacts,
            cancellation: CancellationToken::new(),
            progress: Arc::new(ProgressSender::noop()),
        }
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Builder: attach a progress sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    /// Non-empty caption for segment `index`.
    pub fn caption_for(&self, index: usize) -> Option<&str> {
        self.captions
            .get(index)
            .and_then(|c| c.as_deref())
            .filter(|c| !c.trim().is_empty())
    }

    pub fn has_captions(&self) -> bool {
        (0..self.captions.len()).any(|i| self.caption_for(i).is_some())
    }

    /// Path for an artifact of this job, e.g. `artifact("merged.mp4")`.
    pub fn artifact(&self, name: &str) -> PathBuf {
        self.artifacts.artifact_path(&self.job_id, name)
    }
}
