//! Transcodes the merged clip for the target platform.

use crate::pipeline::context::StageContext;
use crate::pipeline::stage::{Stage, StageError, StageOutcome};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct OptimizeStage;

#[async_trait]
impl Stage for OptimizeStage {
    fn name(&self) -> &'static str {
        "optimize"
    }

    fn label(&self, ctx: &StageContext) -> String {
        format!("Optimizing for {}", ctx.options.optimize_platform)
    }

    fn checkpoints(&self) -> (u8, u8) {
        (80, 90)
    }

    fn should_run(&self, ctx: &StageContext) -> bool {
        ctx.options.optimize_platform.is_enabled()
    }

    /// Failure is recoverable: the merged clip remains the output.
    async fn apply(
        &self,
        ctx: &StageContext,
        artifacts: Vec<PathBuf>,
    ) -> Result<StageOutcome, StageError> {
        let [input] = artifacts.as_slice() else {
            return Err(StageError::Recoverable(format!(
                "expected one merged clip, found {}",
                artifacts.len()
            )));
        };

        let platform = ctx.options.optimize_platform;
        let target = ctx.artifact("final.mp4");
        let optimized = ctx
            .toolchain
            .optimize_for_platform(input, &target, platform)
            .await
            .map_err(|e| StageError::Recoverable(e.to_string()))?;

        Ok(StageOutcome::new(
            vec![optimized],
            format!("optimized for {platform}"),
        ))
    }
}
