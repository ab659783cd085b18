//! Access to a completed job's output.

use reelforge_common::JobId;
use std::path::PathBuf;
use tokio::fs::File;

/// The finished clip of a completed job, opened for reading.
#[derive(Debug)]
pub struct OutputArtifact {
    pub job_id: JobId,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub file: File,
}

impl OutputArtifact {
    /// File name to offer a client downloading the clip.
    pub fn download_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.mp4", self.job_id))
    }
}
