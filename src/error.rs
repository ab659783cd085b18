//! Errors surfaced to callers of the assembly service.

use reelforge_common::{JobId, JobStatus};
use std::path::PathBuf;

/// Result type alias for assembly operations.
pub type Result<T> = std::result::Result<T, AssemblyError>;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// The submission was rejected before any job was created.
    #[error("invalid assembly request: {0}")]
    Validation(String),

    #[error("assembly job {job_id} not found")]
    NotFound { job_id: JobId },

    /// The job completed but its artifact is gone from disk.
    #[error("output of assembly job {job_id} is missing: {}", path.display())]
    OutputMissing { job_id: JobId, path: PathBuf },

    #[error("assembly job {job_id} is not ready (status: {status})")]
    NotReady { job_id: JobId, status: JobStatus },

    #[error("media tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("job storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssemblyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the job or its output could not be located.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::OutputMissing { .. })
    }
}

impl From<reelforge_common::Error> for AssemblyError {
    fn from(err: reelforge_common::Error) -> Self {
        match err {
            reelforge_common::Error::Io(e) => Self::Io(e),
            reelforge_common::Error::InvalidInput(msg) => Self::Validation(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<reelforge_av::Error> for AssemblyError {
    fn from(err: reelforge_av::Error) -> Self {
        match err {
            reelforge_av::Error::ToolNotFound { tool } => Self::ToolUnavailable(tool),
            reelforge_av::Error::Io(e) => Self::Io(e),
            other => Self::Storage(other.to_string()),
        }
    }
}
