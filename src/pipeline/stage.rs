//! The [`Stage`] trait defines one step of the assembly pipeline.

use crate::pipeline::context::StageContext;
use async_trait::async_trait;
use std::path::PathBuf;

/// Why a stage could not produce its output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// The stage's input is still usable; the pipeline continues with it.
    #[error("{0}")]
    Recoverable(String),

    /// No usable artifact exists; the job fails.
    #[error("{0}")]
    Fatal(String),
}

/// Result of a successfully applied stage.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// Ordered artifacts handed to the next stage.
    pub artifacts: Vec<PathBuf>,
    /// Human-readable summary of what the stage did.
    pub summary: String,
}

impl StageOutcome {
    pub fn new(artifacts: Vec<PathBuf>, summary: impl Into<String>) -> Self {
        Self {
            artifacts,
            summary: summary.into(),
        }
    }
}

/// A single step in the assembly pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// A short name for logs (e.g. "caption").
    fn name(&self) -> &'static str;

    /// Label recorded as the job's current step while this stage runs.
    fn label(&self, ctx: &StageContext) -> String;

    /// Progress reported when the stage starts and when it finishes.
    fn checkpoints(&self) -> (u8, u8);

    /// Whether the stage applies to this job.
    fn should_run(&self, ctx: &StageContext) -> bool;

    /// Transform the ordered artifact list.
    async fn apply(
        &self,
        ctx: &StageContext,
        artifacts: Vec<PathBuf>,
    ) -> Result<StageOutcome, StageError>;
}
