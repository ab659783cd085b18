//! Reelforge - Asynchronous assembly of recorded video segments
//!
//! This library crate exposes the assembly service, its stage pipeline and
//! the status registry for the CLI and for integration testing.

pub mod assembly;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod state;

pub use assembly::{AssemblyService, OutputArtifact};
pub use error::{AssemblyError, Result};
