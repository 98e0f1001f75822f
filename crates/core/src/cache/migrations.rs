//! Schema versions of the partition store.
//!
//! `_migrations` records each applied version; opening a store applies the
//! versions above the highest one recorded there.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ascending schema versions.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_partitions.sql"))];

/// Bring the schema up to the latest version.
///
/// # Errors
///
/// `MigrationFailed` names the version whose batch did not apply.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
                row.get(0)
            })
            .map_err(Error::from)?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            conn.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            conn.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tracing::debug!(version, "applied cache migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
