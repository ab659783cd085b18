//! The assembly job record and its state transitions.

use crate::ids::{JobId, ProjectId};
use crate::types::{AssemblyOptions, JobStatus, VideoMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One assembly attempt for a project.
///
/// A job is created `queued`, moved to `processing` when its task starts and
/// ends in `completed` or `failed`. Terminal jobs ignore further transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyJob {
    pub id: JobId,
    pub project_id: ProjectId,
    pub status: JobStatus,
    pub progress: u8,
    pub input_segments: Vec<PathBuf>,
    /// Caption text aligned by index to `input_segments`.
    pub caption_source: Vec<Option<String>>,
    pub options: AssemblyOptions,
    pub output_path: Option<PathBuf>,
    pub metadata: Option<VideoMetadata>,
    pub error: Option<String>,
    pub current_step: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

impl AssemblyJob {
    pub fn new(
        project_id: ProjectId,
        input_segments: Vec<PathBuf>,
        caption_source: Vec<Option<String>>,
        options: AssemblyOptions,
    ) -> Self {
        Self {
            id: JobId::new(),
            project_id,
            status: JobStatus::Queued,
            progress: 0,
            input_segments,
            caption_source,
            options,
            output_path: None,
            metadata: None,
            error: None,
            current_step: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            failed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn start(&mut self) {
        if self.status != JobStatus::Queued {
            return;
        }
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
    }

    /// Raise progress and record the running step.
    ///
    /// Progress never moves backwards and is capped at 100.
    pub fn update_progress(&mut self, progress: u8, step: &str) {
        if self.is_terminal() {
            return;
        }
        self.progress = self.progress.max(progress.min(100));
        self.current_step = Some(step.to_string());
    }

    pub fn complete(&mut self, output_path: PathBuf, metadata: VideoMetadata) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.current_step = None;
        self.output_path = Some(output_path);
        self.metadata = Some(metadata);
        self.completed_at = Some(Utc::now());
    }

    /// Mark the job failed; progress stays at its last value.
    pub fn fail(&mut self, error: &str) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.to_string());
        self.current_step = None;
        self.failed_at = Some(Utc::now());
    }
}
