//! Execution of a single job inside its own supervised task.

use crate::pipeline::{PipelineError, PipelineExecutor, ProgressSender, StageContext};
use crate::state::StatusRegistry;
use parking_lot::Mutex;
use reelforge_av::{ArtifactDir, MediaToolchain};
use reelforge_common::{AssemblyJob, JobId};
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) type TokenMap = Arc<Mutex<HashMap<JobId, CancellationToken>>>;

/// Progress reported once the job task has picked the job up.
const PREPARING_PROGRESS: u8 = 10;

/// Everything a job task needs, detached from the service.
#[derive(Clone)]
pub(crate) struct JobRunner {
    pub registry: Arc<StatusRegistry>,
    pub toolchain: Arc<dyn MediaToolchain>,
    pub artifacts: Arc<ArtifactDir>,
    pub executor: Arc<PipelineExecutor>,
}

impl JobRunner {
    /// Spawn `job` as an independent task.
    ///
    /// The pipeline runs in an inner task so that a panic surfaces as a
    /// `JoinError` here and can be recorded as a failure.
    pub fn spawn_supervised(self, job: AssemblyJob, token: CancellationToken, tokens: TokenMap) {
        tokio::spawn(async move {
            let id = job.id;
            let runner = self.clone();
            let handle = tokio::spawn(async move { runner.run(job, token).await });

            if let Err(e) = handle.await {
                let message = if e.is_panic() {
                    format!("assembly task panicked: {}", panic_message(e.into_panic()))
                } else {
                    "assembly task was aborted".to_string()
                };
                tracing::error!("Job {}: {}", id, message);
                self.registry.fail(id, &message);
                self.discard(id);
            }

            tokens.lock().remove(&id);
        });
    }

    async fn run(&self, job: AssemblyJob, token: CancellationToken) {
        let id = job.id;
        if self.registry.start(id).is_none() {
            tracing::debug!("Job {} was removed before it started", id);
            return;
        }
        tracing::info!(
            "Job {}: assembling {} segments for project {}",
            id,
            job.input_segments.len(),
            job.project_id
        );
        self.registry
            .update_progress(id, PREPARING_PROGRESS, "Preparing segments");

        let registry = self.registry.clone();
        let ctx = StageContext::new(&job, self.toolchain.clone(), self.artifacts.clone())
            .with_cancellation(token)
            .with_progress(ProgressSender::new(move |progress, step| {
                registry.update_progress(id, progress, step);
            }));

        let result = match self.executor.execute(&ctx, job.input_segments.clone()).await {
            Ok(output) => self.finalize(&ctx, output).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(done) => {
                tracing::info!(
                    "Job {} completed: {:?} ({:.1}s)",
                    id,
                    done.output_path,
                    done.metadata.as_ref().map(|m| m.duration_seconds).unwrap_or_default()
                );
            }
            Err(PipelineError::Superseded) => {
                tracing::info!("Job {} superseded, discarding its artifacts", id);
                self.discard(id);
            }
            Err(e @ PipelineError::Fatal { .. }) => {
                tracing::error!("Job {} failed: {}", id, e);
                self.registry.fail(id, &e.to_string());
                self.discard(id);
            }
        }
    }

    /// Probe the chosen artifact and record the job as completed.
    async fn finalize(
        &self,
        ctx: &StageContext,
        output: PathBuf,
    ) -> Result<AssemblyJob, PipelineError> {
        let metadata = self
            .toolchain
            .probe_metadata(&output)
            .await
            .map_err(|e| PipelineError::Fatal {
                stage: "finalize",
                message: format!("failed to read output metadata: {e}"),
            })?;

        if ctx.cancellation.is_cancelled() {
            return Err(PipelineError::Superseded);
        }

        // None means the record was deleted by a newer job in the meantime.
        let job = self
            .registry
            .complete(ctx.job_id, output.clone(), metadata)
            .ok_or(PipelineError::Superseded)?;

        self.remove_intermediates(ctx.job_id, &output);
        Ok(job)
    }

    /// Delete every artifact of `id` except its final output.
    fn remove_intermediates(&self, id: JobId, output: &Path) {
        let artifacts = match self.artifacts.job_artifacts(&id) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                tracing::warn!("Job {}: failed to list intermediate artifacts: {}", id, e);
                return;
            }
        };
        for path in artifacts.iter().filter(|p| p.as_path() != output) {
            if let Err(e) = self.artifacts.remove(path) {
                tracing::warn!("Job {}: failed to remove {:?}: {}", id, path, e);
            }
        }
    }

    /// Delete every artifact of `id`.
    fn discard(&self, id: JobId) {
        match self.artifacts.purge_job(&id) {
            Ok(0) => {}
            Ok(n) => tracing::debug!("Job {}: removed {} artifacts", id, n),
            Err(e) => tracing::warn!("Job {}: failed to purge artifacts: {}", id, e),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42u8)), "unknown panic payload");
    }
}
