//! Embedded schema migrations.
//!
//! Each `NNN_name.sql` file is compiled in and applied once, in version
//! order, inside its own transaction. `schema_migrations` records what ran.

use rusqlite::{Connection, Result};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration {0} failed: {1}")]
    Failed(usize, String),
}

struct Migration {
    version: usize,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "assembly_jobs",
    sql: include_str!("001_assembly_jobs.sql"),
}];

fn ensure_version_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
}

fn applied_version(conn: &Connection) -> Result<usize> {
    let version: Option<usize> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

/// Apply one migration and record it, atomically.
fn apply(conn: &Connection, migration: &Migration) -> Result<(), MigrationError> {
    let failed = |e: rusqlite::Error| MigrationError::Failed(migration.version, e.to_string());

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql).map_err(failed)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![migration.version, migration.name],
    )
    .map_err(failed)?;
    tx.commit().map_err(failed)
}

/// Bring the schema up to [`latest_version`], returning how many
/// migrations were applied.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    ensure_version_table(conn)?;
    let from = applied_version(conn)?;

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > from).collect();
    for migration in &pending {
        apply(conn, migration)?;
        tracing::info!("Applied migration {:03}_{}", migration.version, migration.name);
    }

    Ok(pending.len())
}

/// Schema version recorded in the database.
pub fn current_version(conn: &Connection) -> Result<usize, MigrationError> {
    ensure_version_table(conn)?;
    Ok(applied_version(conn)?)
}

/// Highest version embedded in this build.
pub fn latest_version() -> usize {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}
