//! Schema migrations for the notes collection.
//!
//! # Responsibility
//! - Keep the ordered list of collection migrations.
//! - Bring a connection up to the latest collection schema in one write
//!   transaction.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per migration.
//! - `PRAGMA user_version` records the last applied migration.
//! - Pending work is decided inside the write transaction, so two processes
//!   opening the same file never apply a migration twice.
//! - Migrations only shape the collection; indexes are provisioned by the
//!   repository on construction.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, TransactionBehavior};
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "notes_collection",
    sql: include_str!("0001_notes.sql"),
}];

/// Returns the latest collection schema version known by this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies pending collection migrations and returns the resulting version.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer build.
/// - `Sqlite` when a migration fails; nothing from the run is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<u32> {
    let from_version = current_user_version(conn)?;
    if pending_migrations(from_version)?.is_empty() {
        return Ok(from_version);
    }

    let started_at = Instant::now();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // Another connection may have migrated while we waited for the lock.
    let locked_version = current_user_version(&tx)?;
    let pending = pending_migrations(locked_version)?;

    for migration in pending {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    let to_version = pending.last().map_or(locked_version, |migration| migration.version);
    info!(
        "event=db_migrate module=db status=ok from_version={locked_version} to_version={to_version} applied={} duration_ms={}",
        pending.len(),
        started_at.elapsed().as_millis()
    );
    Ok(to_version)
}

fn pending_migrations(current_version: u32) -> DbResult<&'static [Migration]> {
    let latest = latest_version();
    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    let first_pending = MIGRATIONS.partition_point(|migration| migration.version <= current_version);
    Ok(&MIGRATIONS[first_pending..])
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_start_at_one_and_have_no_gaps() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
        }
    }

    #[test]
    fn pending_is_everything_for_fresh_database_and_nothing_when_current() {
        assert_eq!(pending_migrations(0).unwrap().len(), MIGRATIONS.len());
        assert!(pending_migrations(latest_version()).unwrap().is_empty());
    }

    #[test]
    fn pending_rejects_newer_schema() {
        let err = pending_migrations(latest_version() + 1).unwrap_err();
        assert!(matches!(
            err,
            DbError::UnsupportedSchemaVersion { db_version, .. } if db_version == latest_version() + 1
        ));
    }

    #[test]
    fn apply_reports_version_and_is_noop_when_current() {
        let mut conn = Connection::open_in_memory().unwrap();

        assert_eq!(apply_migrations(&mut conn).unwrap(), latest_version());
        assert_eq!(current_user_version(&conn).unwrap(), latest_version());
        assert_eq!(apply_migrations(&mut conn).unwrap(), latest_version());
    }

    #[test]
    fn failed_migration_leaves_version_untouched() {
        let mut conn = Connection::open_in_memory().unwrap();
        // An index already holding the collection's name blocks CREATE TABLE.
        conn.execute_batch("CREATE TABLE scratch (x); CREATE INDEX notes ON scratch (x);")
            .unwrap();

        assert!(matches!(apply_migrations(&mut conn), Err(DbError::Sqlite(_))));
        assert_eq!(current_user_version(&conn).unwrap(), 0);
    }
}
