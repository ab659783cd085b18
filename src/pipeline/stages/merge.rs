//! Joins the segment list into one clip.
//!
//! With transitions enabled the list is folded left to right, each step
//! joining the running result with the next segment. A failed transition
//! falls back to a hard concat of that pair only; a failed concat is fatal.

use crate::pipeline::context::StageContext;
use crate::pipeline::stage::{Stage, StageError, StageOutcome};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct MergeStage;

impl MergeStage {
    async fn fold_with_transitions(
        &self,
        ctx: &StageContext,
        segments: Vec<PathBuf>,
    ) -> Result<StageOutcome, StageError> {
        let mut segments = segments.into_iter();
        let Some(mut acc) = segments.next() else {
            return Err(StageError::Fatal("no segments to merge".to_string()));
        };
        let mut fallbacks = 0;

        for (offset, next) in segments.enumerate() {
            let step = offset + 1;
            let target = ctx.artifact(&format!("transition_{step}.mp4"));
            match ctx
                .toolchain
                .apply_transition(
                    &acc,
                    &next,
                    &target,
                    ctx.options.transition_type,
                    ctx.options.transition_duration,
                )
                .await
            {
                Ok(path) => acc = path,
                Err(e) => {
                    tracing::warn!(
                        "Job {}: transition {} failed, concatenating instead: {}",
                        ctx.job_id,
                        step,
                        e
                    );
                    fallbacks += 1;
                    let target = ctx.artifact(&format!("concat_{step}.mp4"));
                    acc = ctx
                        .toolchain
                        .merge_segments(&[acc, next], &target)
                        .await
                        .map_err(|e| {
                            StageError::Fatal(format!("concat fallback for join {step} failed: {e}"))
                        })?;
                }
            }
        }

        Ok(StageOutcome::new(
            vec![acc],
            format!("folded with transitions ({fallbacks} hard cuts)"),
        ))
    }
}

#[async_trait]
impl Stage for MergeStage {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn label(&self, ctx: &StageContext) -> String {
        if ctx.options.add_transitions {
            "Merging segments with transitions".to_string()
        } else {
            "Merging segments".to_string()
        }
    }

    fn checkpoints(&self) -> (u8, u8) {
        (50, 70)
    }

    fn should_run(&self, _ctx: &StageContext) -> bool {
        true
    }

    async fn apply(
        &self,
        ctx: &StageContext,
        artifacts: Vec<PathBuf>,
    ) -> Result<StageOutcome, StageError> {
        match artifacts.len() {
            0 => Err(StageError::Fatal(
                "no segments available to merge".to_string(),
            )),
            1 => Ok(StageOutcome::new(artifacts, "single segment, nothing to merge")),
            n if ctx.options.add_transitions => {
                tracing::debug!("Job {}: folding {} segments", ctx.job_id, n);
                self.fold_with_transitions(ctx, artifacts).await
            }
            n => {
                let target = ctx.artifact("merged.mp4");
                let merged = ctx
                    .toolchain
                    .merge_segments(&artifacts, &target)
                    .await
                    .map_err(|e| StageError::Fatal(format!("concat failed: {e}")))?;
                Ok(StageOutcome::new(
                    vec![merged],
                    format!("concatenated {n} segments"),
                ))
            }
        }
    }
}
