//! Data-access layer for the notes collection.
//! This crate owns note persistence, index provisioning and TTL expiry on top
//! of an embedded SQLite store.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;

pub use db::ttl::{purge_expired, Reaper, DEFAULT_REAPER_INTERVAL};
pub use db::{DbError, DbResult, StoreOptions};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{Note, NoteId, NoteIdParseError, NoteStats};
pub use repo::note_repo::{NotesRepository, RepoError, RepoResult, SqliteNotesRepository};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
