//! Caption overlay with `drawtext`.

use super::{require_input, require_output, H264_ARGS};
use crate::toolchain::FfmpegToolchain;
use crate::{Error, Result};
use reelforge_common::CaptionPosition;
use std::path::{Path, PathBuf};

/// Escape text for a `drawtext` option inside a filtergraph.
///
/// Option values and the filtergraph each have their own escaping level;
/// both are applied here. Arguments are passed without a shell.
pub fn escape_drawtext(text: &str) -> String {
    let mut option_level = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

fn y_expression(position: CaptionPosition) -> &'static str {
    match position {
        CaptionPosition::Top => "h*0.08",
        CaptionPosition::Center => "(h-text_h)/2",
        CaptionPosition::Bottom => "h-text_h-h*0.08",
    }
}

/// Build the `drawtext` filter for a caption.
pub fn drawtext_filter(text: &str, font_size: u32, position: CaptionPosition) -> String {
    format!(
        "drawtext=text={}:expansion=none:fontsize={}:fontcolor=white:\
         borderw=2:bordercolor=black:box=1:boxcolor=black@0.4:boxborderw=12:\
         x=(w-text_w)/2:y={}",
        escape_drawtext(text),
        font_size,
        y_expression(position)
    )
}

/// Burn `text` into `input`, writing `output`. Audio is copied untouched.
pub async fn overlay_caption(
    tools: &FfmpegToolchain,
    input: &Path,
    output: &Path,
    text: &str,
    font_size: u32,
    position: CaptionPosition,
) -> Result<PathBuf> {
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("caption text is empty".to_string()));
    }
    require_input(input)?;

    tools
        .ffmpeg()
        .arg("-i")
        .path_arg(input)
        .arg("-vf")
        .arg(drawtext_filter(text, font_size, position))
        .args(H264_ARGS.iter().copied())
        .args(["-c:a", "copy"])
        .path_arg(output)
        .execute()
        .await?;

    require_output(output)
}
