//! The assembly stage pipeline.
//!
//! A job's segments flow through a fixed list of [`Stage`]s. Each stage
//! decides whether it applies, transforms the artifact list, and owns its
//! fallback policy; only a fatal stage error stops the pipeline.

pub mod context;
pub mod executor;
pub mod stage;
pub mod stages;

pub use context::{ProgressSender, StageContext};
pub use executor::{PipelineError, PipelineExecutor};
pub use stage::{Stage, StageError, StageOutcome};
