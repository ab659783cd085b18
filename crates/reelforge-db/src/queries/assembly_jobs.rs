//! Assembly job query operations.
//!
//! Jobs are stored whole: scalar fields in columns, lists and nested structs
//! as JSON text. Timestamps are RFC 3339 in UTC with fixed precision so they
//! compare correctly as text.

use chrono::{DateTime, SecondsFormat, Utc};
use reelforge_common::{AssemblyJob, Error, JobId, JobStatus, ProjectId, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;

const COLUMNS: &str = "id, project_id, status, progress, input_segments, caption_source, options,
     output_path, metadata, error, current_step, created_at, started_at, completed_at, failed_at";

fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::corrupt(format!("timestamp {s:?}: {e}")))
}

fn parse_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

/// Raw column values before decoding.
struct JobRow {
    id: String,
    project_id: String,
    status: String,
    progress: i64,
    input_segments: String,
    caption_source: String,
    options: String,
    output_path: Option<String>,
    metadata: Option<String>,
    error: Option<String>,
    current_step: Option<String>,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    failed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            status: row.get(2)?,
            progress: row.get(3)?,
            input_segments: row.get(4)?,
            caption_source: row.get(5)?,
            options: row.get(6)?,
            output_path: row.get(7)?,
            metadata: row.get(8)?,
            error: row.get(9)?,
            current_step: row.get(10)?,
            created_at: row.get(11)?,
            started_at: row.get(12)?,
            completed_at: row.get(13)?,
            failed_at: row.get(14)?,
        })
    }

    fn into_job(self) -> Result<AssemblyJob> {
        let id: JobId = self
            .id
            .parse()
            .map_err(|e| Error::corrupt(format!("job id {:?}: {}", self.id, e)))?;
        let status: JobStatus = self.status.parse().map_err(Error::corrupt)?;
        let progress = u8::try_from(self.progress)
            .map_err(|_| Error::corrupt(format!("progress {}", self.progress)))?;

        Ok(AssemblyJob {
            id,
            project_id: ProjectId::new(self.project_id),
            status,
            progress,
            input_segments: serde_json::from_str(&self.input_segments)?,
            caption_source: serde_json::from_str(&self.caption_source)?,
            options: serde_json::from_str(&self.options)?,
            output_path: self.output_path.map(PathBuf::from),
            metadata: self
                .metadata
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            error: self.error,
            current_step: self.current_step,
            created_at: parse_ts(&self.created_at)?,
            started_at: parse_opt_ts(self.started_at)?,
            completed_at: parse_opt_ts(self.completed_at)?,
            failed_at: parse_opt_ts(self.failed_at)?,
        })
    }
}

/// Insert a job, or replace the stored copy if it already exists.
pub fn upsert_job(conn: &Connection, job: &AssemblyJob) -> Result<()> {
    let metadata = job.metadata.as_ref().map(serde_json::to_string).transpose()?;

    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO assembly_jobs ({COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        params![
            job.id.to_string(),
            job.project_id.as_str(),
            job.status.to_string(),
            job.progress,
            serde_json::to_string(&job.input_segments)?,
            serde_json::to_string(&job.caption_source)?,
            serde_json::to_string(&job.options)?,
            job.output_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            metadata,
            job.error,
            job.current_step,
            fmt_ts(&job.created_at),
            job.started_at.as_ref().map(fmt_ts),
            job.completed_at.as_ref().map(fmt_ts),
            job.failed_at.as_ref().map(fmt_ts),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Look up a job, returning `None` if it is not stored.
pub fn find_job(conn: &Connection, id: JobId) -> Result<Option<AssemblyJob>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM assembly_jobs WHERE id = ?"),
        [id.to_string()],
        JobRow::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))?
    .map(JobRow::into_job)
    .transpose()
}

/// Get a job by ID.
pub fn get_job(conn: &Connection, id: JobId) -> Result<AssemblyJob> {
    find_job(conn, id)?.ok_or_else(|| Error::not_found(format!("assembly job {id}")))
}

/// All stored jobs for a project, newest first.
pub fn list_jobs_for_project(conn: &Connection, project: &ProjectId) -> Result<Vec<AssemblyJob>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM assembly_jobs WHERE project_id = ? ORDER BY created_at DESC"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([project.as_str()], JobRow::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    rows.into_iter().map(JobRow::into_job).collect()
}

/// Delete a job. Returns whether a row was removed.
pub fn delete_job(conn: &Connection, id: JobId) -> Result<bool> {
    let removed = conn
        .execute("DELETE FROM assembly_jobs WHERE id = ?", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(removed > 0)
}

/// Delete completed and failed jobs created before `cutoff`.
pub fn prune_terminal_jobs(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    conn.execute(
        "DELETE FROM assembly_jobs
         WHERE status IN ('completed', 'failed') AND created_at < ?",
        [fmt_ts(&cutoff)],
    )
    .map_err(|e| Error::database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};
    use chrono::Duration;
    use reelforge_common::{AssemblyOptions, Platform, VideoMetadata};

    fn new_job(project: &str) -> AssemblyJob {
        AssemblyJob::new(
            ProjectId::new(project),
            vec![PathBuf::from("/up/a.mp4"), PathBuf::from("/up/b.mp4")],
            vec![Some("Hello".into()), None],
            AssemblyOptions {
                optimize_platform: Platform::Tiktok,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_upsert_and_get() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let mut job = new_job("p1");
        job.start();
        job.update_progress(70, "merging");
        job.complete(
            PathBuf::from("/processed/x_final.mp4"),
            VideoMetadata {
                duration_seconds: 9.5,
                width: 1080,
                height: 1920,
                format_name: "mp4".into(),
                ..Default::default()
            },
        );
        upsert_job(&conn, &job).unwrap();

        let stored = get_job(&conn, job.id).unwrap();
        assert_eq!(stored.id, job.id);
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.progress, 100);
        assert_eq!(stored.input_segments, job.input_segments);
        assert_eq!(stored.caption_source, job.caption_source);
        assert_eq!(stored.options, job.options);
        assert_eq!(stored.output_path, job.output_path);
        assert_eq!(stored.metadata, job.metadata);
        assert!(stored.completed_at.is_some());
    }

    #[test]
    fn test_upsert_replaces() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let mut job = new_job("p1");
        upsert_job(&conn, &job).unwrap();
        job.start();
        job.update_progress(50, "merging");
        job.fail("concat failed");
        upsert_job(&conn, &job).unwrap();

        let stored = get_job(&conn, job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.progress, 50);
        assert_eq!(stored.error.as_deref(), Some("concat failed"));
        assert_eq!(list_jobs_for_project(&conn, &job.project_id).unwrap().len(), 1);
    }

    #[test]
    fn test_get_missing_job() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let err = get_job(&conn, JobId::new()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(find_job(&conn, JobId::new()).unwrap().is_none());
    }

    #[test]
    fn test_project_listing_and_deletion() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let a = new_job("p1");
        let b = new_job("p1");
        let other = new_job("p2");
        for job in [&a, &b, &other] {
            upsert_job(&conn, job).unwrap();
        }

        let p1 = ProjectId::new("p1");
        assert_eq!(list_jobs_for_project(&conn, &p1).unwrap().len(), 2);

        assert!(delete_job(&conn, a.id).unwrap());
        assert!(!delete_job(&conn, a.id).unwrap());
        assert_eq!(list_jobs_for_project(&conn, &p1).unwrap().len(), 1);
        assert!(get_job(&conn, other.id).is_ok());
    }

    #[test]
    fn test_prune_terminal_jobs() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let mut old_done = new_job("p1");
        old_done.created_at = Utc::now() - Duration::days(40);
        old_done.start();
        old_done.fail("boom");

        let mut old_live = new_job("p2");
        old_live.created_at = Utc::now() - Duration::days(40);

        let mut recent_done = new_job("p3");
        recent_done.start();
        recent_done.fail("boom");

        for job in [&old_done, &old_live, &recent_done] {
            upsert_job(&conn, job).unwrap();
        }

        let pruned = prune_terminal_jobs(&conn, Utc::now() - Duration::days(30)).unwrap();
        assert_eq!(pruned, 1);
        assert!(find_job(&conn, old_done.id).unwrap().is_none());
        assert!(find_job(&conn, old_live.id).unwrap().is_some());
        assert!(find_job(&conn, recent_done.id).unwrap().is_some());
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let id = JobId::new();

        conn.execute(
            "INSERT INTO assembly_jobs (id, project_id, status, input_segments, caption_source, options, created_at)
             VALUES (?, 'p1', 'queued', 'not json', '[]', '{}', '2024-01-01T00:00:00Z')",
            [id.to_string()],
        )
        .unwrap();

        assert!(matches!(get_job(&conn, id), Err(Error::Corrupt(_))));
    }
}
