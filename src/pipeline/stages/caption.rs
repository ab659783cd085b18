//! Burns per-segment captions into the input segments.

use crate::pipeline::context::StageContext;
use crate::pipeline::stage::{Stage, StageError, StageOutcome};
use async_trait::async_trait;
use std::path::PathBuf;

/// Longest caption overlaid on a segment, in characters.
pub const MAX_CAPTION_CHARS: usize = 100;

/// Trim surrounding whitespace and cut to [`MAX_CAPTION_CHARS`] characters.
pub fn truncate_caption(text: &str) -> String {
    text.trim().chars().take(MAX_CAPTION_CHARS).collect()
}

pub struct CaptionStage;

#[async_trait]
impl Stage for CaptionStage {
    fn name(&self) -> &'static str {
        "caption"
    }

    fn label(&self, _ctx: &StageContext) -> String {
        "Adding captions".to_string()
    }

    fn checkpoints(&self) -> (u8, u8) {
        (20, 40)
    }

    fn should_run(&self, ctx: &StageContext) -> bool {
        ctx.options.add_captions && ctx.has_captions()
    }

    /// Segments missing from disk are dropped. A failed overlay falls back to
    /// the uncaptioned segment at that index.
    async fn apply(
        &self,
        ctx: &StageContext,
        artifacts: Vec<PathBuf>,
    ) -> Result<StageOutcome, StageError> {
        let total = artifacts.len();
        let mut output = Vec::with_capacity(total);
        let mut captioned = 0;

        for (index, segment) in artifacts.into_iter().enumerate() {
            if !segment.exists() {
                tracing::warn!(
                    "Job {}: segment {} not found, skipping: {:?}",
                    ctx.job_id,
                    index,
                    segment
                );
                continue;
            }

            let Some(text) = ctx.caption_for(index) else {
                output.push(segment);
                continue;
            };

            let text = truncate_caption(text);
            let target = ctx.artifact(&format!("subtitle_{index}.mp4"));
            match ctx
                .toolchain
                .overlay_caption(
                    &segment,
                    &target,
                    &text,
                    ctx.options.caption_font_size,
                    ctx.options.caption_position,
                )
                .await
            {
                Ok(path) => {
                    captioned += 1;
                    output.push(path);
                }
                Err(e) => {
                    tracing::warn!(
                        "Job {}: caption overlay failed for segment {}, using original: {}",
                        ctx.job_id,
                        index,
                        e
                    );
                    output.push(segment);
                }
            }
        }

        Ok(StageOutcome::new(
            output,
            format!("captioned {captioned} of {total} segments"),
        ))
    }
}
