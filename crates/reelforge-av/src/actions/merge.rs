//! Hard concatenation through the concat demuxer.

use super::{require_input, require_output, AAC_ARGS, H264_ARGS};
use crate::toolchain::FfmpegToolchain;
use crate::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Concatenate `inputs` in order into `output`, re-encoding to H.264/AAC.
pub async fn merge_segments(
    tools: &FfmpegToolchain,
    inputs: &[PathBuf],
    output: &Path,
) -> Result<PathBuf> {
    if inputs.is_empty() {
        return Err(Error::InvalidInput("nothing to merge".to_string()));
    }
    for input in inputs {
        require_input(input)?;
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Merging {} segments into {:?}", inputs.len(), output);

    let list_dir = output.parent().unwrap_or_else(|| Path::new("."));
    let mut list = tempfile::Builder::new()
        .prefix(".concat-")
        .suffix(".txt")
        .tempfile_in(list_dir)?;
    for input in inputs {
        let absolute = std::fs::canonicalize(input)?;
        writeln!(list, "{}", concat_list_entry(&absolute))?;
    }
    list.flush()?;

    tools
        .ffmpeg()
        .args(["-f", "concat", "-safe", "0", "-i"])
        .path_arg(list.path())
        .args(H264_ARGS.iter().copied())
        .args(AAC_ARGS.iter().copied())
        .args(["-movflags", "+faststart"])
        .path_arg(output)
        .execute()
        .await?;

    require_output(output)
}

/// One line of a concat demuxer list file.
fn concat_list_entry(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("file '{}'", raw.replace('\'', r"'\''"))
}
