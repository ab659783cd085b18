//! Job lifecycle management.
//!
//! [`AssemblyService`] is the entry point for callers: it validates a
//! submission, supersedes whatever the project had running, records the new
//! job and hands it to a supervised task. Callers then poll [`status`] or
//! follow [`subscribe`] until the job is terminal and read the clip with
//! [`fetch_output`].
//!
//! [`status`]: AssemblyService::status
//! [`subscribe`]: AssemblyService::subscribe
//! [`fetch_output`]: AssemblyService::fetch_output

mod output;
mod runner;

pub use output::OutputArtifact;

use crate::config::Config;
use crate::error::{AssemblyError, Result};
use crate::pipeline::PipelineExecutor;
use crate::state::{AssemblyEvent, StatusRegistry};
use parking_lot::Mutex;
use reelforge_av::{ArtifactDir, FfmpegToolchain, MediaToolchain};
use reelforge_common::paths::is_project_segment;
use reelforge_common::{
    AssemblyJob, AssemblyOptions, AssemblyRequestOptions, JobId, JobStatus, ProjectId,
};
use reelforge_db::pool::DbPool;
use runner::{JobRunner, TokenMap};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

pub struct AssemblyService {
    registry: Arc<StatusRegistry>,
    toolchain: Arc<dyn MediaToolchain>,
    artifacts: Arc<ArtifactDir>,
    upload_dir: PathBuf,
    defaults: AssemblyOptions,
    executor: Arc<PipelineExecutor>,
    /// Cancellation handles of jobs whose task has not finished yet.
    tokens: TokenMap,
    /// Serializes purge-then-insert so a project never has two live jobs.
    submit_lock: Mutex<()>,
}

impl AssemblyService {
    pub fn new(
        registry: Arc<StatusRegistry>,
        toolchain: Arc<dyn MediaToolchain>,
        artifacts: ArtifactDir,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            toolchain,
            artifacts: Arc::new(artifacts),
            upload_dir: upload_dir.into(),
            defaults: AssemblyOptions::default(),
            executor: Arc::new(PipelineExecutor::standard()),
            tokens: Arc::new(Mutex::new(HashMap::new())),
            submit_lock: Mutex::new(()),
        }
    }

    /// Build a service backed by ffmpeg, failing with
    /// [`AssemblyError::ToolUnavailable`] if ffmpeg or ffprobe is missing.
    pub fn from_config(config: &Config, db: DbPool) -> Result<Self> {
        let toolchain = FfmpegToolchain::discover(
            config.tools.ffmpeg_path.as_deref(),
            config.tools.ffprobe_path.as_deref(),
        )?
        .with_timeout(config.tools.timeout());
        tracing::debug!(
            "Using ffmpeg at {:?}, ffprobe at {:?}",
            toolchain.ffmpeg_path(),
            toolchain.ffprobe_path()
        );

        let defaults = config.defaults.resolve();
        defaults.validate().map_err(AssemblyError::Validation)?;

        let artifacts = ArtifactDir::new(&config.storage.artifact_dir)?;
        Ok(Self::new(
            StatusRegistry::new(db),
            Arc::new(toolchain),
            artifacts,
            &config.storage.upload_dir,
        )
        .with_defaults(defaults))
    }

    /// Builder: option values applied to fields a request leaves unset.
    pub fn with_defaults(mut self, defaults: AssemblyOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Builder: replace the standard stage list.
    pub fn with_executor(mut self, executor: PipelineExecutor) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    pub fn registry(&self) -> &Arc<StatusRegistry> {
        &self.registry
    }

    pub fn artifact_dir(&self) -> &Path {
        self.artifacts.root()
    }

    /// Receive an [`AssemblyEvent`] for every job change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AssemblyEvent> {
        self.registry.subscribe()
    }

    /// Submit a new assembly job for `project_id` and return its id.
    ///
    /// Every previous job of the project is superseded first. The job runs
    /// on its own task; this call does not wait for it and must be made from
    /// within a tokio runtime.
    pub fn start(
        &self,
        project_id: ProjectId,
        input_segments: Vec<PathBuf>,
        caption_source: Vec<Option<String>>,
        options: AssemblyRequestOptions,
    ) -> Result<JobId> {
        if input_segments.is_empty() {
            return Err(AssemblyError::validation(
                "at least one input segment is required",
            ));
        }
        let options = options.resolve_over(&self.defaults);
        options.validate().map_err(AssemblyError::Validation)?;

        let job = AssemblyJob::new(project_id, input_segments, caption_source, options);
        let id = job.id;
        let token = {
            let _guard = self.submit_lock.lock();
            let purged = self.purge_project(&job.project_id);
            if purged > 0 {
                tracing::info!(
                    "Superseded {} previous job(s) of project {}",
                    purged,
                    job.project_id
                );
            }

            let token = tokio_util::sync::CancellationToken::new();
            self.tokens.lock().insert(id, token.clone());
            self.registry.insert(job.clone());
            token
        };

        tracing::info!("Queued assembly job {} for project {}", id, job.project_id);
        self.runner()
            .spawn_supervised(job, token, self.tokens.clone());
        Ok(id)
    }

    /// Snapshot of a job from either registry tier.
    pub fn status(&self, id: JobId) -> Result<AssemblyJob> {
        self.registry.require(id)
    }

    /// Open the output of a completed job.
    pub async fn fetch_output(&self, id: JobId) -> Result<OutputArtifact> {
        let job = self.status(id)?;
        if job.status != JobStatus::Completed {
            return Err(AssemblyError::NotReady {
                job_id: id,
                status: job.status,
            });
        }
        let path = job
            .output_path
            .ok_or(AssemblyError::NotFound { job_id: id })?;

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssemblyError::OutputMissing { job_id: id, path });
            }
            Err(e) => return Err(e.into()),
        };
        let size_bytes = file.metadata().await?.len();

        Ok(OutputArtifact {
            job_id: id,
            path,
            size_bytes,
            file,
        })
    }

    /// Wait until a job is terminal and return its final snapshot.
    ///
    /// Fails with [`AssemblyError::NotFound`] if the job is superseded while
    /// waiting.
    pub async fn wait_for(&self, id: JobId) -> Result<AssemblyJob> {
        let mut events = self.subscribe();
        loop {
            let job = self.status(id)?;
            if job.is_terminal() {
                return Ok(job);
            }

            loop {
                match events.recv().await {
                    Ok(event) if event.job_id() == id && event.is_final() => break,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("Event follower lagged by {} events", skipped);
                        break;
                    }
                    Err(RecvError::Closed) => {
                        return Err(AssemblyError::Storage("event channel closed".to_string()));
                    }
                }
            }
        }
    }

    /// Supersede every job of `project` and delete its records and
    /// artifacts. Returns how many jobs were removed.
    ///
    /// Individual failures are logged and skipped.
    pub fn purge_project(&self, project: &ProjectId) -> usize {
        let jobs = match self.registry.jobs_for_project(project) {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!(
                    "Failed to list stored jobs of project {}, purging live jobs only: {}",
                    project,
                    e
                );
                self.registry
                    .live_jobs()
                    .into_iter()
                    .filter(|job| &job.project_id == project)
                    .collect()
            }
        };

        for job in &jobs {
            if let Some(token) = self.tokens.lock().remove(&job.id) {
                token.cancel();
            }
            self.registry.broadcast(AssemblyEvent::JobSuperseded {
                id: job.id,
                project_id: project.clone(),
            });

            if let Some(output) = &job.output_path {
                // A single-segment job may point at the upload itself.
                if self.artifacts.owns(output, &job.id) {
                    if let Err(e) = self.artifacts.remove(output) {
                        tracing::warn!("Failed to delete output {:?} of job {}: {}", output, job.id, e);
                    }
                }
            }
            if let Err(e) = self.artifacts.purge_job(&job.id) {
                tracing::warn!("Failed to purge artifacts of job {}: {}", job.id, e);
            }
            if let Err(e) = self.registry.delete(job.id) {
                tracing::warn!("Failed to delete record of job {}: {}", job.id, e);
            }
        }

        jobs.len()
    }

    /// Uploaded segments of `project`, sorted by file name.
    pub fn discover_segments(&self, project: &ProjectId) -> Result<Vec<PathBuf>> {
        discover_segments(&self.upload_dir, project)
    }

    /// Delete finished job records older than `days` days.
    pub fn prune_history(&self, days: u32) -> Result<usize> {
        let removed = self.registry.prune(days)?;
        if removed > 0 {
            tracing::info!("Pruned {} finished job(s) older than {} days", removed, days);
        }
        Ok(removed)
    }

    fn runner(&self) -> JobRunner {
        JobRunner {
            registry: self.registry.clone(),
            toolchain: self.toolchain.clone(),
            artifacts: self.artifacts.clone(),
            executor: self.executor.clone(),
        }
    }
}

/// Files in `upload_dir` named `{project}_*` with a segment extension,
/// sorted by file name. A missing directory yields no segments.
pub fn discover_segments(upload_dir: &Path, project: &ProjectId) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(upload_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Upload directory does not exist: {:?}", upload_dir);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut segments = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_project_segment(&path, project) {
            segments.push(path);
        }
    }
    segments.sort();
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_segments_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["p1_b.mp4", "p1_a.MOV", "p1_notes.txt", "p10_a.mp4", "p2_a.avi"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("p1_dir.mp4")).unwrap();

        let found = discover_segments(dir.path(), &ProjectId::new("p1")).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["p1_a.MOV", "p1_b.mp4"]);
    }

    #[test]
    fn test_discover_segments_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let found = discover_segments(&dir.path().join("absent"), &ProjectId::new("p1")).unwrap();
        assert!(found.is_empty());
    }
}
