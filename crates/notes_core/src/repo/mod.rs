//! Repository layer for the notes collection.
//!
//! # Responsibility
//! - Define the use-case oriented data access contract.
//! - Isolate SQLite query details from callers.
//!
//! # Invariants
//! - Repository APIs return the semantic `NotFound` error in addition to
//!   driver errors, which pass through untouched.

pub mod note_repo;
