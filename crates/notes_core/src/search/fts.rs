//! SQLite FTS5 text index over note titles and contents.
//!
//! # Responsibility
//! - Provision the `notes_fts` index and the triggers that keep it in sync.
//! - Translate free-form user text into a safe FTS5 match expression.
//!
//! # Invariants
//! - `notes_fts` is an external-content index; its rowid is the note id.
//! - Every user term is quoted, so FTS5 operators in user text are literal.
//! - Terms are OR-ed: a note matches when it contains any of them.
//! - No stemming: tokens match by whole word after case and diacritic
//!   folding, so `заметки` does not find `заметка`.

use rusqlite::Connection;

/// Name of the FTS5 index table.
pub const TEXT_INDEX: &str = "notes_fts";

// unicode61 folds case for Cyrillic as well as Latin text; diacritic folding
// keeps accented spellings searchable.
const CREATE_TEXT_INDEX_SQL: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(
    title,
    content,
    content = 'notes',
    content_rowid = 'id',
    tokenize = 'unicode61 remove_diacritics 2'
);

CREATE TRIGGER IF NOT EXISTS notes_fts_after_insert AFTER INSERT ON notes BEGIN
    INSERT INTO notes_fts (rowid, title, content)
    VALUES (new.id, new.title, new.content);
END;

CREATE TRIGGER IF NOT EXISTS notes_fts_after_delete AFTER DELETE ON notes BEGIN
    INSERT INTO notes_fts (notes_fts, rowid, title, content)
    VALUES ('delete', old.id, old.title, old.content);
END;

CREATE TRIGGER IF NOT EXISTS notes_fts_after_update AFTER UPDATE OF title, content ON notes BEGIN
    INSERT INTO notes_fts (notes_fts, rowid, title, content)
    VALUES ('delete', old.id, old.title, old.content);
    INSERT INTO notes_fts (rowid, title, content)
    VALUES (new.id, new.title, new.content);
END;
";

/// Creates the text index and its sync triggers when missing.
///
/// When the index is created over a collection that already holds notes, it
/// is rebuilt from the collection so those notes become searchable.
/// Returns `true` when the index was created by this call.
pub fn ensure_text_index(conn: &Connection) -> rusqlite::Result<bool> {
    let existed = text_index_exists(conn)?;
    conn.execute_batch(CREATE_TEXT_INDEX_SQL)?;
    if existed {
        return Ok(false);
    }

    conn.execute("INSERT INTO notes_fts (notes_fts) VALUES ('rebuild');", [])?;
    Ok(true)
}

/// Builds an FTS5 match expression from user text.
///
/// Returns `None` for blank input, which callers treat as "no text filter".
pub fn build_match_expression(text: &str) -> Option<String> {
    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" OR "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn text_index_exists(conn: &Connection) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [TEXT_INDEX],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
