//! Full-text search support for the notes collection.
//!
//! # Responsibility
//! - Own the FTS5 index definition and user-query escaping.
//! - Leave ranking to SQLite (`bm25`); callers only pick sort order.

pub mod fts;
