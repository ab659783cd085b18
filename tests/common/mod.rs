//! Shared test harness for integration tests.
//!
//! Provides [`FakeToolchain`], a scriptable [`MediaToolchain`] that writes
//! small text files describing how each artifact was produced, and
//! [`TestHarness`], which wires it into an [`AssemblyService`] backed by
//! temporary directories and an in-memory database.

#![allow(dead_code)]

use async_trait::async_trait;
use reelforge::assembly::AssemblyService;
use reelforge::pipeline::StageContext;
use reelforge::state::StatusRegistry;
use reelforge_av::{ArtifactDir, Error, MediaToolchain, Result};
use reelforge_common::{
    AssemblyJob, AssemblyOptions, CaptionPosition, JobId, Platform, ProjectId, TransitionType,
    VideoMetadata,
};
use reelforge_db::pool::init_memory_pool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Duration reported by [`FakeToolchain::probe_metadata`].
pub const FAKE_DURATION: f64 = 4.5;

/// One recorded toolchain invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Merge { inputs: Vec<PathBuf>, output: PathBuf },
    Transition { first: PathBuf, second: PathBuf, output: PathBuf },
    Overlay { input: PathBuf, output: PathBuf, text: String },
    Optimize { input: PathBuf, output: PathBuf, platform: Platform },
    Probe { path: PathBuf },
}

/// Scriptable toolchain that never touches ffmpeg.
///
/// Every output file contains a lineage string such as
/// `merge(caption(a.mp4)+b.mp4)` so tests can check what flowed where.
#[derive(Default)]
pub struct FakeToolchain {
    calls: Mutex<Vec<Call>>,
    transitions_seen: Mutex<usize>,
    delay: Option<Duration>,
    fail_overlay_on: HashSet<String>,
    fail_transition_at: HashSet<usize>,
    fail_merge: bool,
    fail_optimize: bool,
    fail_probe: bool,
    panic_on_merge: bool,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail overlays whose input file is named `name`.
    pub fn fail_overlay_on(mut self, name: &str) -> Self {
        self.fail_overlay_on.insert(name.to_string());
        self
    }

    /// Fail the `step`-th transition call (1-based).
    pub fn fail_transition_at(mut self, step: usize) -> Self {
        self.fail_transition_at.insert(step);
        self
    }

    pub fn fail_merge(mut self) -> Self {
        self.fail_merge = true;
        self
    }

    pub fn fail_optimize(mut self) -> Self {
        self.fail_optimize = true;
        self
    }

    pub fn fail_probe(mut self) -> Self {
        self.fail_probe = true;
        self
    }

    pub fn panic_on_merge(mut self) -> Self {
        self.panic_on_merge = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn merge_calls(&self) -> Vec<Vec<PathBuf>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Merge { inputs, .. } => Some(inputs),
                _ => None,
            })
            .collect()
    }

    pub fn transition_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Transition { .. }))
            .count()
    }

    pub fn overlay_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Overlay { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

async fn lineage(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|_| Error::file_not_found(path))
}

async fn write(output: &Path, content: String) -> Result<PathBuf> {
    tokio::fs::write(output, content).await?;
    Ok(output.to_path_buf())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl MediaToolchain for FakeToolchain {
    async fn merge_segments(&self, inputs: &[PathBuf], output: &Path) -> Result<PathBuf> {
        self.record(Call::Merge {
            inputs: inputs.to_vec(),
            output: output.to_path_buf(),
        });
        self.pause().await;
        if self.panic_on_merge {
            panic!("merge exploded");
        }
        if self.fail_merge {
            return Err(Error::tool_failed("ffmpeg", "concat failed"));
        }
        let mut parts = Vec::new();
        for input in inputs {
            parts.push(lineage(input).await?);
        }
        write(output, format!("merge({})", parts.join("+"))).await
    }

    async fn apply_transition(
        &self,
        first: &Path,
        second: &Path,
        output: &Path,
        transition: TransitionType,
        _duration: f64,
    ) -> Result<PathBuf> {
        self.record(Call::Transition {
            first: first.to_path_buf(),
            second: second.to_path_buf(),
            output: output.to_path_buf(),
        });
        let step = {
            let mut seen = self.transitions_seen.lock().unwrap();
            *seen += 1;
            *seen
        };
        self.pause().await;
        if self.fail_transition_at.contains(&step) {
            return Err(Error::tool_failed("ffmpeg", "xfade failed"));
        }
        let a = lineage(first).await?;
        let b = lineage(second).await?;
        write(output, format!("{transition}({a}+{b})")).await
    }

    async fn overlay_caption(
        &self,
        input: &Path,
        output: &Path,
        text: &str,
        _font_size: u32,
        _position: CaptionPosition,
    ) -> Result<PathBuf> {
        self.record(Call::Overlay {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            text: text.to_string(),
        });
        self.pause().await;
        if self.fail_overlay_on.contains(&file_name(input)) {
            return Err(Error::tool_failed("ffmpeg", "drawtext failed"));
        }
        let source = lineage(input).await?;
        write(output, format!("caption({source})")).await
    }

    async fn optimize_for_platform(
        &self,
        input: &Path,
        output: &Path,
        platform: Platform,
    ) -> Result<PathBuf> {
        self.record(Call::Optimize {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            platform,
        });
        self.pause().await;
        if self.fail_optimize {
            return Err(Error::tool_failed("ffmpeg", "encoder crashed"));
        }
        let source = lineage(input).await?;
        write(output, format!("{platform}({source})")).await
    }

    async fn probe_metadata(&self, path: &Path) -> Result<VideoMetadata> {
        self.record(Call::Probe {
            path: path.to_path_buf(),
        });
        if self.fail_probe {
            return Err(Error::parse_error("ffprobe", "no video stream"));
        }
        let size_bytes = tokio::fs::metadata(path)
            .await
            .map_err(|_| Error::file_not_found(path))?
            .len();
        Ok(VideoMetadata {
            duration_seconds: FAKE_DURATION,
            width: 1920,
            height: 1080,
            frame_rate: Some(30.0),
            video_codec: Some("h264".to_string()),
            audio_codec: Some("aac".to_string()),
            size_bytes,
            bit_rate: Some(8_000_000),
            format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        })
    }
}

/// An [`AssemblyService`] over a [`FakeToolchain`] and temporary storage.
pub struct TestHarness {
    pub uploads: TempDir,
    pub processed: TempDir,
    pub toolchain: Arc<FakeToolchain>,
    pub service: AssemblyService,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_toolchain(FakeToolchain::new())
    }

    pub fn with_toolchain(toolchain: FakeToolchain) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let processed = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(toolchain);
        let registry = StatusRegistry::new(init_memory_pool().expect("failed to create in-memory pool"));
        let service = AssemblyService::new(
            registry,
            toolchain.clone(),
            ArtifactDir::new(processed.path()).unwrap(),
            uploads.path(),
        );

        Self {
            uploads,
            processed,
            toolchain,
            service,
        }
    }

    /// Write an uploaded segment whose lineage is its own file name.
    pub fn segment(&self, name: &str) -> PathBuf {
        let path = self.uploads.path().join(name);
        std::fs::write(&path, name).unwrap();
        path
    }

    /// Write `{project}_a.mp4`, `{project}_b.mp4`, ... in playback order.
    pub fn segments(&self, project: &str, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| self.segment(&format!("{project}_{}.mp4", (b'a' + i as u8) as char)))
            .collect()
    }

    /// File names currently in the artifact directory, sorted.
    pub fn artifact_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.processed.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Artifact names written by `job`, without the job prefix.
    pub fn artifacts_of(&self, job: JobId) -> Vec<String> {
        let prefix = job.artifact_prefix();
        self.artifact_names()
            .into_iter()
            .filter_map(|n| n.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// A stage context for driving stages directly.
    pub fn context(&self, options: AssemblyOptions, captions: Vec<Option<String>>) -> StageContext {
        let job = AssemblyJob::new(ProjectId::new("p1"), vec![], captions, options);
        StageContext::new(
            &job,
            self.toolchain.clone(),
            Arc::new(ArtifactDir::new(self.processed.path()).unwrap()),
        )
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

pub fn caption(text: &str) -> Option<String> {
    Some(text.to_string())
}
