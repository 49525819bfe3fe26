//! Versioned schema for the record store.
//!
//! `_migrations` holds one row per applied version. Each pending migration
//! runs in its own transaction together with its version row.

use super::Error;
use crate::record::timestamp;
use tokio_rusqlite::{Connection, params, rusqlite};

/// `(version, SQL)` in ascending order.
///
/// Statements use `IF NOT EXISTS`, so a `cache` table written before
/// versioning existed is adopted as-is.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_cache.sql"))];

/// Apply every migration newer than the recorded version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), rusqlite::Error> {
        conn.execute_batch("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL)")?;
        let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            tracing::debug!("applying schema version {version}");
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.execute("INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)", params![version, timestamp()])?;
            tx.commit()?;
        }
        Ok(())
    })
    .await
    .map_err(|e| Error::MigrationFailed(e.to_string()))
}
