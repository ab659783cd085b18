use reelforge_common::AssemblyRequestOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    /// Option defaults for jobs started from this configuration.
    #[serde(default)]
    pub defaults: AssemblyRequestOptions,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding uploaded segments named `{project_id}_*`.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Directory for intermediate and final artifacts.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Finished jobs older than this many days are pruned (default: 30)
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}
fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./processed")
}
fn default_database_path() -> PathBuf {
    PathBuf::from("./reelforge.db")
}
fn default_retention_days() -> u32 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            artifact_dir: default_artifact_dir(),
            database_path: default_database_path(),
            retention_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Per-invocation limit; unset means tools may run indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelforge_common::Platform;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.storage.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.storage.artifact_dir, PathBuf::from("./processed"));
        assert_eq!(config.storage.retention_days, 30);
        assert!(config.tools.timeout().is_none());
        assert_eq!(config.defaults, AssemblyRequestOptions::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            upload_dir = "/srv/uploads"
            artifact_dir = "/srv/processed"

            [tools]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            timeout_secs = 600

            [defaults]
            optimize_platform = "tiktok"
            transition_type = "dissolve"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.upload_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(config.tools.timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.defaults.optimize_platform, Some(Platform::Tiktok));
        assert!(config.defaults.add_captions.is_none());
    }
}
