//! Pipeline executor: runs the stages of one job in order, reporting
//! progress checkpoints and stopping early on supersession or a fatal error.

use crate::pipeline::context::StageContext;
use crate::pipeline::stage::{Stage, StageError};
use crate::pipeline::stages::{CaptionStage, MergeStage, OptimizeStage};
use std::path::PathBuf;

/// Why the pipeline did not produce an output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// A newer job for the same project cancelled this one.
    #[error("superseded by a newer assembly job")]
    Superseded,

    #[error("{stage} stage failed: {message}")]
    Fatal {
        stage: &'static str,
        message: String,
    },
}

pub struct PipelineExecutor {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineExecutor {
    /// Create an executor from a list of stages.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Caption, merge, then platform optimization.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(CaptionStage),
            Box::new(MergeStage),
            Box::new(OptimizeStage),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every applicable stage over `inputs`, returning the single
    /// artifact left at the end.
    ///
    /// The cancellation token is checked before each stage and once more
    /// before returning.
    pub async fn execute(
        &self,
        ctx: &StageContext,
        inputs: Vec<PathBuf>,
    ) -> Result<PathBuf, PipelineError> {
        let mut artifacts = inputs;

        for stage in &self.stages {
            if ctx.cancellation.is_cancelled() {
                tracing::info!("Job {} superseded before {} stage", ctx.job_id, stage.name());
                return Err(PipelineError::Superseded);
            }

            if !stage.should_run(ctx) {
                tracing::debug!("Job {}: skipping {} stage", ctx.job_id, stage.name());
                ctx.progress
                    .send(stage.checkpoints().1, &format!("Skipped {}", stage.name()));
                continue;
            }

            let (start, end) = stage.checkpoints();
            let label = stage.label(ctx);
            ctx.progress.send(start, &label);
            tracing::info!("[{}%] Job {}: {}", start, ctx.job_id, label);

            match stage.apply(ctx, artifacts.clone()).await {
                Ok(outcome) => {
                    tracing::debug!("Job {}: {}", ctx.job_id, outcome.summary);
                    artifacts = outcome.artifacts;
                }
                Err(StageError::Recoverable(message)) => {
                    tracing::warn!(
                        "Job {}: {} stage failed, keeping its input: {}",
                        ctx.job_id,
                        stage.name(),
                        message
                    );
                }
                Err(StageError::Fatal(message)) => {
                    tracing::error!("Job {}: {} stage failed: {}", ctx.job_id, stage.name(), message);
                    return Err(PipelineError::Fatal {
                        stage: stage.name(),
                        message,
                    });
                }
            }

            ctx.progress.send(end, &label);
        }

        if ctx.cancellation.is_cancelled() {
            tracing::info!("Job {} superseded before finalization", ctx.job_id);
            return Err(PipelineError::Superseded);
        }

        match artifacts.as_slice() {
            [single] => Ok(single.clone()),
            other => Err(PipelineError::Fatal {
                stage: "finalize",
                message: format!("expected one output artifact, found {}", other.len()),
            }),
        }
    }
}
