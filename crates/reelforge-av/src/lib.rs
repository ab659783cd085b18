//! # reelforge-av
//!
//! The media toolchain behind reelforge's assembly pipeline.
//!
//! This crate provides:
//! - The [`MediaToolchain`] trait: merge, transition, caption overlay,
//!   platform optimization and metadata probing
//! - [`FfmpegToolchain`], which implements it with the ffmpeg and ffprobe CLIs
//! - [`ArtifactDir`], the job-scoped directory every artifact is written to
//! - Tool detection helpers used by `reelforge check-tools`
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use reelforge_av::{FfmpegToolchain, MediaToolchain};
//! use std::path::Path;
//!
//! # async fn example() -> reelforge_av::Result<()> {
//! let tools = FfmpegToolchain::discover(None, None)?;
//! let meta = tools.probe_metadata(Path::new("/uploads/p1_intro.mp4")).await?;
//! println!("{}x{} for {:.1}s", meta.width, meta.height, meta.duration_seconds);
//! # Ok(())
//! # }
//! ```

pub mod actions;
mod command;
mod error;
pub mod probe;
pub mod tools;
mod toolchain;
pub mod workspace;

// Re-exports
pub use actions::{profile_for, PlatformProfile};
pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use toolchain::{FfmpegToolchain, MediaToolchain};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
pub use workspace::ArtifactDir;
