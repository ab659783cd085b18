//! Reelforge-DB: Durable storage for assembly jobs.
//!
//! Terminal assembly jobs are written here so their status survives a
//! restart. SQLite is accessed through rusqlite with r2d2 pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use reelforge_db::pool::{init_pool, get_conn};
//! use reelforge_db::queries::assembly_jobs;
//! use reelforge_common::ProjectId;
//!
//! let pool = init_pool("/var/lib/reelforge/reelforge.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! for job in assembly_jobs::list_jobs_for_project(&conn, &ProjectId::new("p1")).unwrap() {
//!     println!("{} {}", job.id, job.status);
//! }
//! ```

pub mod migrations;
pub mod pool;
pub mod queries;
