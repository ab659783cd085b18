//! Database query operations.

pub mod assembly_jobs;
