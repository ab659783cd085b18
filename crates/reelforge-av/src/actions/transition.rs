//! Cross transitions between two clips with `xfade`.

use super::{require_input, require_output, AAC_ARGS, H264_ARGS};
use crate::toolchain::FfmpegToolchain;
use crate::{Error, Result};
use reelforge_common::{TransitionType, VideoMetadata};
use std::path::{Path, PathBuf};

const FALLBACK_FPS: f64 = 30.0;

/// Name of the `xfade` transition for a transition style.
pub fn xfade_name(transition: TransitionType) -> &'static str {
    match transition {
        TransitionType::Fade => "fade",
        TransitionType::Wipe => "wipeleft",
        TransitionType::Dissolve => "dissolve",
        TransitionType::SlideDown => "slidedown",
        TransitionType::SlideUp => "slideup",
    }
}

/// Join `first` and `second` with a `duration`-second transition.
///
/// The transition starts `duration` seconds before the end of `first`. The
/// second clip is scaled and padded to the first clip's frame so `xfade`
/// accepts the pair. Audio is cross-faded only when both clips carry it.
pub async fn apply_transition(
    tools: &FfmpegToolchain,
    first: &Path,
    second: &Path,
    output: &Path,
    transition: TransitionType,
    duration: f64,
) -> Result<PathBuf> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "transition duration must be positive, got {duration}"
        )));
    }
    require_input(first)?;
    require_input(second)?;

    let meta_first = tools.probe(first).await?;
    let meta_second = tools.probe(second).await?;
    let with_audio = meta_first.has_audio() && meta_second.has_audio();
    let graph = transition_graph(&meta_first, transition, duration, with_audio);

    #[cfg(feature = "tracing")]
    tracing::debug!("xfade graph for {:?}: {}", output, graph);

    let mut cmd = tools.ffmpeg();
    cmd.arg("-i")
        .path_arg(first)
        .arg("-i")
        .path_arg(second)
        .arg("-filter_complex")
        .arg(graph)
        .args(["-map", "[v]"]);
    if with_audio {
        cmd.args(["-map", "[a]"]).args(AAC_ARGS.iter().copied());
    }
    cmd.args(H264_ARGS.iter().copied()).path_arg(output);
    cmd.execute().await?;

    require_output(output)
}

fn transition_graph(
    first: &VideoMetadata,
    transition: TransitionType,
    duration: f64,
    with_audio: bool,
) -> String {
    let (w, h) = (first.width.max(2), first.height.max(2));
    let fps = first
        .frame_rate
        .filter(|f| f.is_finite() && *f > 0.0)
        .unwrap_or(FALLBACK_FPS);
    let offset = (first.duration_seconds - duration).max(0.0);

    let mut graph = format!(
        "[0:v]fps={fps:.3},settb=AVTB,setsar=1,format=yuv420p[v0];\
         [1:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps:.3},settb=AVTB,setsar=1,format=yuv420p[v1];\
         [v0][v1]xfade=transition={name}:duration={duration:.3}:offset={offset:.3}[v]",
        name = xfade_name(transition),
    );
    if with_audio {
        graph.push_str(&format!(";[0:a][1:a]acrossfade=d={duration:.3}[a]"));
    }
    graph
}
