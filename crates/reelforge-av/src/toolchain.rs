//! The media toolchain abstraction and its ffmpeg implementation.

use crate::actions;
use crate::command::ToolCommand;
use crate::probe::probe_with_ffprobe;
use crate::tools::get_tool_path;
use crate::Result;
use async_trait::async_trait;
use reelforge_common::{CaptionPosition, Platform, TransitionType, VideoMetadata};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Stateless media primitives used by the assembly pipeline.
///
/// Every operation writes exactly one artifact at `output` and returns its
/// path on success.
#[async_trait]
pub trait MediaToolchain: Send + Sync {
    /// Hard-concatenate `inputs` in order.
    async fn merge_segments(&self, inputs: &[PathBuf], output: &Path) -> Result<PathBuf>;

    /// Join two clips with a transition of `duration` seconds.
    async fn apply_transition(
        &self,
        first: &Path,
        second: &Path,
        output: &Path,
        transition: TransitionType,
        duration: f64,
    ) -> Result<PathBuf>;

    /// Burn a caption into a clip.
    async fn overlay_caption(
        &self,
        input: &Path,
        output: &Path,
        text: &str,
        font_size: u32,
        position: CaptionPosition,
    ) -> Result<PathBuf>;

    /// Transcode a clip for a distribution platform.
    async fn optimize_for_platform(
        &self,
        input: &Path,
        output: &Path,
        platform: Platform,
    ) -> Result<PathBuf>;

    /// Read technical metadata of a clip.
    async fn probe_metadata(&self, path: &Path) -> Result<VideoMetadata>;
}

/// [`MediaToolchain`] backed by the ffmpeg and ffprobe executables.
#[derive(Debug, Clone)]
pub struct FfmpegToolchain {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegToolchain {
    /// Locate ffmpeg and ffprobe, preferring configured paths over `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ToolNotFound`] if either tool is missing.
    pub fn discover(ffmpeg_path: Option<&Path>, ffprobe_path: Option<&Path>) -> Result<Self> {
        let ffmpeg = get_tool_path("ffmpeg", ffmpeg_path)?;
        let ffprobe = get_tool_path("ffprobe", ffprobe_path)?;

        #[cfg(feature = "tracing")]
        tracing::info!("Using ffmpeg at {:?}, ffprobe at {:?}", ffmpeg, ffprobe);

        Ok(Self {
            ffmpeg,
            ffprobe,
            timeout: None,
        })
    }

    /// Use the given executables without checking that they exist.
    pub fn with_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout: None,
        }
    }

    /// Limit every tool invocation to `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe
    }

    /// A non-interactive ffmpeg command that overwrites its output.
    pub(crate) fn ffmpeg(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"])
            .timeout(self.timeout);
        cmd
    }

    pub(crate) async fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        probe_with_ffprobe(&self.ffprobe, path, self.timeout).await
    }
}

#[async_trait]
impl MediaToolchain for FfmpegToolchain {
    async fn merge_segments(&self, inputs: &[PathBuf], output: &Path) -> Result<PathBuf> {
        actions::merge_segments(self, inputs, output).await
    }

    async fn apply_transition(
        &self,
        first: &Path,
        second: &Path,
        output: &Path,
        transition: TransitionType,
        duration: f64,
    ) -> Result<PathBuf> {
        actions::apply_transition(self, first, second, output, transition, duration).await
    }

    async fn overlay_caption(
        &self,
        input: &Path,
        output: &Path,
        text: &str,
        font_size: u32,
        position: CaptionPosition,
    ) -> Result<PathBuf> {
        actions::overlay_caption(self, input, output, text, font_size, position).await
    }

    async fn optimize_for_platform(
        &self,
        input: &Path,
        output: &Path,
        platform: Platform,
    ) -> Result<PathBuf> {
        actions::optimize_for_platform(self, input, output, platform).await
    }

    async fn probe_metadata(&self, path: &Path) -> Result<VideoMetadata> {
        self.probe(path).await
    }
}
