//! Status registry for assembly jobs.
//!
//! Live jobs are kept in memory. When a job reaches a terminal state it is
//! written through to SQLite and evicted, so the durable store is the only
//! copy of finished jobs. Every change is broadcast as an [`AssemblyEvent`].

use crate::error::{AssemblyError, Result};
use parking_lot::RwLock;
use reelforge_common::{AssemblyJob, JobId, ProjectId, VideoMetadata};
use reelforge_db::pool::{get_conn, DbPool};
use reelforge_db::queries::assembly_jobs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// Change notification for a single assembly job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AssemblyEvent {
    JobQueued {
        job: AssemblyJob,
    },
    JobStarted {
        id: JobId,
    },
    JobProgress {
        id: JobId,
        progress: u8,
        step: String,
    },
    JobCompleted {
        job: AssemblyJob,
    },
    JobFailed {
        id: JobId,
        error: String,
    },
    /// A newer job for the same project replaced this one.
    JobSuperseded {
        id: JobId,
        project_id: ProjectId,
    },
}

impl AssemblyEvent {
    /// The job this event is about.
    pub fn job_id(&self) -> JobId {
        match self {
            AssemblyEvent::JobQueued { job } | AssemblyEvent::JobCompleted { job } => job.id,
            AssemblyEvent::JobStarted { id }
            | AssemblyEvent::JobProgress { id, .. }
            | AssemblyEvent::JobFailed { id, .. }
            | AssemblyEvent::JobSuperseded { id, .. } => *id,
        }
    }

    /// Whether no further events will follow for this job.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            AssemblyEvent::JobCompleted { .. }
                | AssemblyEvent::JobFailed { .. }
                | AssemblyEvent::JobSuperseded { .. }
        )
    }
}

pub struct StatusRegistry {
    jobs: RwLock<HashMap<JobId, AssemblyJob>>,
    db: DbPool,
    event_tx: broadcast::Sender<AssemblyEvent>,
}

impl StatusRegistry {
    pub fn new(db: DbPool) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            jobs: RwLock::new(HashMap::new()),
            db,
            event_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssemblyEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event to all subscribers.
    pub fn broadcast(&self, event: AssemblyEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("No subscribers for assembly event");
        }
    }

    /// Register a freshly created job.
    pub fn insert(&self, job: AssemblyJob) {
        self.jobs.write().insert(job.id, job.clone());
        self.broadcast(AssemblyEvent::JobQueued { job });
    }

    /// Snapshot of a job, from memory first and the durable store second.
    pub fn get(&self, id: JobId) -> Result<Option<AssemblyJob>> {
        if let Some(job) = self.jobs.read().get(&id) {
            return Ok(Some(job.clone()));
        }
        let conn = get_conn(&self.db)?;
        Ok(assembly_jobs::find_job(&conn, id)?)
    }

    /// Jobs held in memory, i.e. queued or processing.
    pub fn live_jobs(&self) -> Vec<AssemblyJob> {
        self.jobs.read().values().cloned().collect()
    }

    /// Every known job of a project across both tiers.
    pub fn jobs_for_project(&self, project: &ProjectId) -> Result<Vec<AssemblyJob>> {
        let mut found: HashMap<JobId, AssemblyJob> = {
            let conn = get_conn(&self.db)?;
            assembly_jobs::list_jobs_for_project(&conn, project)?
                .into_iter()
                .map(|job| (job.id, job))
                .collect()
        };
        for job in self.jobs.read().values() {
            if &job.project_id == project {
                found.insert(job.id, job.clone());
            }
        }
        let mut jobs: Vec<_> = found.into_values().collect();
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }

    /// Mutate a live job in place and return the new snapshot.
    ///
    /// Returns `None` without calling `f` if the job is not in memory, which
    /// is the case once it was deleted or already finished. A job that turns
    /// terminal is written to the durable store and evicted; if that write
    /// fails it stays in memory so status queries still see it.
    pub fn update<F>(&self, id: JobId, f: F) -> Option<AssemblyJob>
    where
        F: FnOnce(&mut AssemblyJob),
    {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(&id)?;
        f(job);
        let snapshot = job.clone();

        if snapshot.is_terminal() {
            match self.persist(&snapshot) {
                Ok(()) => {
                    jobs.remove(&id);
                }
                Err(e) => {
                    tracing::error!("Failed to persist assembly job {}: {}", id, e);
                }
            }
        }
        Some(snapshot)
    }

    fn persist(&self, job: &AssemblyJob) -> Result<()> {
        let conn = get_conn(&self.db)?;
        assembly_jobs::upsert_job(&conn, job)?;
        Ok(())
    }

    /// Mark a job as processing.
    pub fn start(&self, id: JobId) -> Option<AssemblyJob> {
        let job = self.update(id, |job| job.start())?;
        self.broadcast(AssemblyEvent::JobStarted { id });
        Some(job)
    }

    /// Raise job progress and record the running step.
    pub fn update_progress(&self, id: JobId, progress: u8, step: &str) -> Option<AssemblyJob> {
        let job = self.update(id, |job| job.update_progress(progress, step))?;
        self.broadcast(AssemblyEvent::JobProgress {
            id,
            progress: job.progress,
            step: step.to_string(),
        });
        Some(job)
    }

    pub fn complete(
        &self,
        id: JobId,
        output_path: PathBuf,
        metadata: VideoMetadata,
    ) -> Option<AssemblyJob> {
        let job = self.update(id, |job| job.complete(output_path, metadata))?;
        self.broadcast(AssemblyEvent::JobCompleted { job: job.clone() });
        Some(job)
    }

    pub fn fail(&self, id: JobId, error: &str) -> Option<AssemblyJob> {
        let job = self.update(id, |job| job.fail(error))?;
        self.broadcast(AssemblyEvent::JobFailed {
            id,
            error: error.to_string(),
        });
        Some(job)
    }

    /// Remove a job from both tiers.
    ///
    /// The memory lock is held across the durable delete so a concurrent
    /// terminal write cannot land after it.
    pub fn delete(&self, id: JobId) -> Result<()> {
        let mut jobs = self.jobs.write();
        jobs.remove(&id);
        let conn = get_conn(&self.db)?;
        assembly_jobs::delete_job(&conn, id)?;
        Ok(())
    }

    /// Delete finished jobs created more than `days` days ago.
    pub fn prune(&self, days: u32) -> Result<usize> {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(days));
        let conn = get_conn(&self.db)?;
        Ok(assembly_jobs::prune_terminal_jobs(&conn, cutoff)?)
    }

    /// Look up a job or fail with [`AssemblyError::NotFound`].
    pub fn require(&self, id: JobId) -> Result<AssemblyJob> {
        self.get(id)?
            .ok_or(AssemblyError::NotFound { job_id: id })
    }
}
