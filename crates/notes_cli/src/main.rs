//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `notes_core` linkage and store bootstrap end to end.
//! - Print collection stats for the database given as first argument, or for
//!   a fresh in-memory store when no path is given.

use notes_core::db::{open_db, open_db_in_memory};
use notes_core::{NotesRepository, SqliteNotesRepository};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("notes_core version={}", notes_core::core_version());

    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: Option<String>) -> Result<(), Box<dyn Error>> {
    let conn = match db_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let repo = SqliteNotesRepository::try_new(&conn)?;
    let stats = repo.stats()?;

    println!(
        "notes count={} avg_content_len={:.2}",
        stats.count, stats.avg_content_len
    );
    Ok(())
}
