//! Domain model for the notes collection.
//!
//! # Responsibility
//! - Define the note document shape shared by repository and callers.
//! - Keep identifier parsing in one place so every entry point agrees on
//!   what a malformed id is.

pub mod note;
