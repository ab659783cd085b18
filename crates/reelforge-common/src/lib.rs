//! Reelforge-Common: Shared types, constants, and utilities.
//!
//! This crate provides the pieces every reelforge crate agrees on:
//!
//! - **Typed IDs**: [`JobId`] (UUID) and [`ProjectId`] (opaque string)
//! - **Job Model**: [`AssemblyJob`] and its state machine
//! - **Options**: [`AssemblyOptions`] with the defaulting rules applied at submission
//! - **Path Utilities**: segment detection and job-scoped artifact naming
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use reelforge_common::{AssemblyOptions, AssemblyRequestOptions, Platform};
//!
//! let options = AssemblyRequestOptions {
//!     optimize_platform: Some(Platform::Tiktok),
//!     ..Default::default()
//! }
//! .resolve();
//!
//! assert!(options.add_transitions);
//! assert_eq!(options.optimize_platform, Platform::Tiktok);
//! assert_eq!(AssemblyOptions::default().caption_font_size, 48);
//! ```

pub mod error;
pub mod ids;
pub mod job;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use job::AssemblyJob;
pub use types::*;
