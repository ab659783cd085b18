//! Path utilities for segment detection and job-scoped artifact naming.
//!
//! Uploaded segments are named `{project_id}_<anything>.<ext>` and every
//! artifact a job writes is named `{job_id}_<stage>...`, so both can be
//! found again by prefix alone.

use crate::ids::{JobId, ProjectId};
use std::path::Path;

/// Extensions accepted as project segments.
const SEGMENT_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

/// Check if a path has a segment file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelforge_common::paths::is_segment_file;
///
/// assert!(is_segment_file(Path::new("p1_intro.mp4")));
/// assert!(is_segment_file(Path::new("/uploads/p1_take2.MOV")));
/// assert!(!is_segment_file(Path::new("p1_notes.txt")));
/// ```
pub fn is_segment_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SEGMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Get the list of segment file extensions.
#[must_use]
pub fn segment_extensions() -> &'static [&'static str] {
    SEGMENT_EXTENSIONS
}

/// Check if `path` is an uploaded segment belonging to `project`.
pub fn is_project_segment(path: &Path, project: &ProjectId) -> bool {
    let prefix = format!("{}_", project.as_str());
    file_name_starts_with(path, &prefix) && is_segment_file(path)
}

/// Check if `path` names an artifact written by `job`.
pub fn is_job_artifact(path: &Path, job: &JobId) -> bool {
    file_name_starts_with(path, &job.artifact_prefix())
}

fn file_name_starts_with(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(prefix))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_extensions_case_insensitive() {
        assert!(is_segment_file(Path::new("clip.AVI")));
        assert!(is_segment_file(Path::new("clip.Mov")));
        assert!(!is_segment_file(Path::new("clip.mkv")));
        assert!(!is_segment_file(Path::new("clip")));
    }

    #[test]
    fn test_project_segment_requires_prefix() {
        let project = ProjectId::new("p1");
        assert!(is_project_segment(Path::new("/up/p1_a.mp4"), &project));
        assert!(!is_project_segment(Path::new("/up/p10_a.mp4"), &project));
        assert!(!is_project_segment(Path::new("/up/p1_a.txt"), &project));
        assert!(!is_project_segment(Path::new("/up/xp1_a.mp4"), &project));
    }

    #[test]
    fn test_job_artifact_prefix() {
        let job = JobId::new();
        let other = JobId::new();
        let name = format!("/processed/{}merged.mp4", job.artifact_prefix());
        assert!(is_job_artifact(Path::new(&name), &job));
        assert!(!is_job_artifact(Path::new(&name), &other));
        assert!(!is_job_artifact(Path::new("/processed/p1_a.mp4"), &job));
    }
}
