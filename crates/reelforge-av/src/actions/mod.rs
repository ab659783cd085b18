//! ffmpeg invocations behind each toolchain primitive.

pub mod caption;
pub mod merge;
pub mod optimize;
pub mod transition;

pub use caption::{drawtext_filter, escape_drawtext, overlay_caption};
pub use merge::merge_segments;
pub use optimize::{optimize_for_platform, profile_for, PlatformProfile};
pub use transition::{apply_transition, xfade_name};

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// H.264 settings shared by every re-encoding step.
pub(crate) const H264_ARGS: &[&str] = &[
    "-c:v", "libx264", "-preset", "fast", "-crf", "23", "-pix_fmt", "yuv420p",
];

/// AAC settings for steps that re-encode audio.
pub(crate) const AAC_ARGS: &[&str] = &["-c:a", "aac", "-b:a", "128k"];

pub(crate) fn require_input(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::file_not_found(path))
    }
}

/// Confirm ffmpeg actually wrote a non-empty file.
pub(crate) fn require_output(path: &Path) -> Result<PathBuf> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(path.to_path_buf()),
        _ => Err(Error::MissingOutput {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_output_rejects_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.mp4");
        assert!(require_output(&path).is_err());

        std::fs::write(&path, b"").unwrap();
        assert!(require_output(&path).is_err());

        std::fs::write(&path, b"data").unwrap();
        assert_eq!(require_output(&path).unwrap(), path);
    }
}
