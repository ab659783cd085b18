//! Job-scoped artifact directory.

use crate::{Error, Result};
use reelforge_common::paths::is_job_artifact;
use reelforge_common::JobId;
use std::path::{Path, PathBuf};

/// Directory holding every intermediate and final artifact.
///
/// Artifacts are named `{job_id}_<name>` so concurrent jobs never collide
/// and a job's files can be found again by prefix.
///
/// # Example
///
/// ```no_run
/// use reelforge_av::ArtifactDir;
/// use reelforge_common::JobId;
///
/// let dir = ArtifactDir::new("./processed")?;
/// let job = JobId::new();
/// let merged = dir.artifact_path(&job, "merged.mp4");
/// // ... run the toolchain ...
/// dir.purge_job(&job)?;
/// # Ok::<(), reelforge_av::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    root: PathBuf,
}

impl ArtifactDir {
    /// Open the directory, creating it if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Get the directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of artifact `name` owned by `job`.
    pub fn artifact_path(&self, job: &JobId, name: &str) -> PathBuf {
        self.root.join(format!("{}{}", job.artifact_prefix(), name))
    }

    /// Whether `path` is an artifact of `job` inside this directory.
    pub fn owns(&self, path: &Path, job: &JobId) -> bool {
        path.parent() == Some(self.root.as_path()) && is_job_artifact(path, job)
    }

    /// List every file written by `job`.
    pub fn job_artifacts(&self, job: &JobId) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_file() && is_job_artifact(&path, job) {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }

    /// Delete every file written by `job`, returning how many were removed.
    ///
    /// Individual removal failures are skipped; only an unreadable directory
    /// is an error.
    pub fn purge_job(&self, job: &JobId) -> Result<usize> {
        let mut removed = 0;
        for path in self.job_artifacts(job)? {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Failed to remove artifact {:?}: {}", path, _e);
                }
            }
        }
        Ok(removed)
    }

    /// Remove a single artifact; a file that is already gone is not an error.
    pub fn remove(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_are_prefixed() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ArtifactDir::new(tmp.path()).unwrap();
        let job = JobId::new();

        let path = dir.artifact_path(&job, "merged.mp4");
        assert!(path.starts_with(tmp.path()));
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("{}_merged.mp4", job)
        );
        assert!(dir.owns(&path, &job));
        assert!(!dir.owns(&path, &JobId::new()));
    }

    #[test]
    fn test_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let dir = ArtifactDir::new(&nested).unwrap();
        assert!(dir.root().is_dir());
    }

    #[test]
    fn test_purge_only_touches_own_job() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ArtifactDir::new(tmp.path()).unwrap();
        let job = JobId::new();
        let other = JobId::new();

        for name in ["subtitle_0.mp4", "transition_1.mp4", "final.mp4"] {
            std::fs::write(dir.artifact_path(&job, name), b"x").unwrap();
        }
        let kept = dir.artifact_path(&other, "final.mp4");
        std::fs::write(&kept, b"y").unwrap();

        assert_eq!(dir.job_artifacts(&job).unwrap().len(), 3);
        assert_eq!(dir.purge_job(&job).unwrap(), 3);
        assert!(dir.job_artifacts(&job).unwrap().is_empty());
        assert!(kept.exists());
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ArtifactDir::new(tmp.path()).unwrap();
        assert!(dir.remove(&tmp.path().join("gone.mp4")).is_ok());
    }
}
