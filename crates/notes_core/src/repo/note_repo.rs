//! Notes repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Translate note lifecycle operations into queries on the `notes` collection.
//! - Provision the collection indexes on construction.
//!
//! # Invariants
//! - Malformed ids and missing documents both surface as `RepoError::NotFound`.
//! - Every other failure is the driver error, unchanged.
//! - `updated_at` strictly increases on every update.
//! - Statements and row cursors are scoped to one call and released on drop,
//!   including early `?` returns.

use crate::db::{now_epoch_ms, DbError};
use crate::model::note::{Note, NoteId, NoteStats};
use crate::search::fts::{build_match_expression, ensure_text_index};
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const COLLECTION: &str = "notes";

const NOTE_COLUMNS: &str = "notes.id AS id,
    notes.title AS title,
    notes.content AS content,
    notes.created_at AS created_at,
    notes.updated_at AS updated_at,
    notes.expires_at AS expires_at";

const CREATE_INDEXES_SQL: &str = "
CREATE UNIQUE INDEX IF NOT EXISTS idx_notes_title_unique ON notes (title ASC);
CREATE INDEX IF NOT EXISTS idx_notes_expires_at ON notes (expires_at ASC);
";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error taxonomy for note persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Id is malformed or no document matches it.
    NotFound,
    /// Driver failure, passed through unchanged.
    Db(DbError),
    /// The collection table has not been created on this connection.
    MissingCollection(&'static str),
    InvalidData(String),
}

impl RepoError {
    /// Returns `true` for the "no such note" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns `true` when the store rejected a duplicate `title`.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Db(_) if self.is_unique_violation() => "unique_violation",
            Self::Db(_) => "db_error",
            Self::MissingCollection(_) => "missing_collection",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "note not found"),
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingCollection(name) => write!(f, "missing collection table `{name}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound | Self::MissingCollection(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the note lifecycle.
///
/// Ids are taken in their textual form; see [`NoteId::parse`].
/// `limit` follows the store convention: `0` means unlimited and a negative
/// value is used by its absolute value.
pub trait NotesRepository {
    /// Inserts a note stamped with `created_at = updated_at = now`.
    fn create(&self, title: &str, content: &str) -> RepoResult<Note> {
        self.create_with_expiry(title, content, None)
    }

    /// Inserts a note that the store removes once `expires_at` has passed.
    fn create_with_expiry(
        &self,
        title: &str,
        content: &str,
        expires_at: Option<i64>,
    ) -> RepoResult<Note>;

    /// Loads one note; `NotFound` when `id` is malformed or absent.
    fn by_id(&self, id: &str) -> RepoResult<Note>;

    /// Offset pagination. Blank `query` sorts by `created_at DESC`; otherwise
    /// only text matches are returned, most relevant first, with `score` set.
    /// Negative `skip` is treated as zero.
    fn list(&self, query: &str, limit: i64, skip: i64) -> RepoResult<Vec<Note>>;

    /// Cursor pagination by descending id, returning ids below `after_id`.
    /// A blank or malformed `after_id` applies no cursor.
    fn list_after(&self, query: &str, after_id: &str, limit: i64) -> RepoResult<Vec<Note>>;

    /// Note count and average content length in code points; `{0, 0}` when empty.
    fn stats(&self) -> RepoResult<NoteStats>;

    /// Replaces only the provided fields and refreshes `updated_at`.
    /// Returns the note as stored after the update.
    fn update(&self, id: &str, title: Option<&str>, content: Option<&str>) -> RepoResult<Note>;

    /// Removes one note; `NotFound` when `id` is malformed or absent.
    fn delete(&self, id: &str) -> RepoResult<()>;
}

/// SQLite-backed notes repository over a caller-owned connection.
pub struct SqliteNotesRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotesRepository<'conn> {
    /// Constructs a repository and ensures the collection indexes exist.
    ///
    /// Safe to call repeatedly on the same database.
    ///
    /// # Errors
    /// - `MissingCollection` when migrations have not been applied.
    /// - `Db` when any index cannot be created, e.g. duplicate titles already
    ///   stored block the unique index.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let started_at = Instant::now();
        match ensure_indexes(conn) {
            Ok(text_index_created) => {
                info!(
                    "event=repo_init module=repo status=ok duration_ms={} text_index_created={}",
                    started_at.elapsed().as_millis(),
                    text_index_created
                );
                Ok(Self { conn })
            }
            Err(err) => {
                error!(
                    "event=repo_init module=repo status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    fn insert_note(
        &self,
        title: &str,
        content: &str,
        expires_at: Option<i64>,
    ) -> RepoResult<Note> {
        let now = now_epoch_ms();
        self.conn.execute(
            "INSERT INTO notes (title, content, created_at, updated_at, expires_at)
             VALUES (?1, ?2, ?3, ?3, ?4);",
            params![title, content, now, expires_at],
        )?;

        let raw_id = self.conn.last_insert_rowid();
        let id = NoteId::from_raw(raw_id)
            .ok_or_else(|| RepoError::InvalidData(format!("store assigned id {raw_id}")))?;

        Ok(Note {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
            expires_at,
            score: None,
        })
    }

    fn find_note(&self, id: &str) -> RepoResult<Note> {
        let note_id = NoteId::parse(id).ok_or(RepoError::NotFound)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS}, NULL AS score
             FROM notes
             WHERE notes.id = ?1;"
        ))?;

        let mut rows = stmt.query([note_id.as_raw()])?;
        match rows.next()? {
            Some(row) => parse_note_row(row),
            None => Err(RepoError::NotFound),
        }
    }

    fn query_page(&self, query: &str, limit: i64, skip: i64) -> RepoResult<Vec<Note>> {
        let limit = effective_limit(limit);
        let skip = skip.max(0);

        let Some(match_expr) = build_match_expression(query) else {
            return self.collect_notes(
                &format!(
                    "SELECT {NOTE_COLUMNS}, NULL AS score
                     FROM notes
                     ORDER BY notes.created_at DESC, notes.id DESC
                     LIMIT ?1 OFFSET ?2;"
                ),
                vec![Value::Integer(limit), Value::Integer(skip)],
            );
        };

        self.collect_notes(
            &format!(
                "SELECT {NOTE_COLUMNS}, -bm25(notes_fts) AS score
                 FROM notes_fts
                 JOIN notes ON notes.id = notes_fts.rowid
                 WHERE notes_fts MATCH ?1
                 ORDER BY score DESC, notes.id DESC
                 LIMIT ?2 OFFSET ?3;"
            ),
            vec![
                Value::Text(match_expr),
                Value::Integer(limit),
                Value::Integer(skip),
            ],
        )
    }

    fn query_after(&self, query: &str, after_id: &str, limit: i64) -> RepoResult<Vec<Note>> {
        let mut sql = format!("SELECT {NOTE_COLUMNS}, NULL AS score FROM notes");
        let mut bind_values: Vec<Value> = Vec::new();
        let match_expr = build_match_expression(query);

        if match_expr.is_some() {
            sql.push_str(" JOIN notes_fts ON notes_fts.rowid = notes.id");
        }
        sql.push_str(" WHERE 1 = 1");

        if let Some(match_expr) = match_expr {
            sql.push_str(" AND notes_fts MATCH ?");
            bind_values.push(Value::Text(match_expr));
        }

        match NoteId::parse(after_id) {
            Some(cursor) => {
                sql.push_str(" AND notes.id < ?");
                bind_values.push(Value::Integer(cursor.as_raw()));
            }
            None if !after_id.is_empty() => {
                debug!("event=note_list_after module=repo status=ok cursor=ignored reason=malformed_id");
            }
            None => {}
        }

        sql.push_str(" ORDER BY notes.id DESC LIMIT ?");
        bind_values.push(Value::Integer(effective_limit(limit)));

        self.collect_notes(&sql, bind_values)
    }

    fn aggregate_stats(&self) -> RepoResult<NoteStats> {
        // `length(text)` stops at the first NUL; NULs are one byte each in
        // UTF-8, so the byte difference adds them back.
        let (count, avg_content_len) = self.conn.query_row(
            "SELECT
                COUNT(*) AS count,
                AVG(content_len) AS avg_content_len
             FROM (
                SELECT
                    length(replace(content, char(0), ''))
                    + length(CAST(content AS BLOB))
                    - length(CAST(replace(content, char(0), '') AS BLOB)) AS content_len
                FROM notes
             );",
            [],
            |row| Ok((row.get::<_, i64>("count")?, row.get::<_, Option<f64>>("avg_content_len")?)),
        )?;

        Ok(NoteStats {
            count,
            avg_content_len: avg_content_len.unwrap_or(0.0),
        })
    }

    fn update_note(
        &self,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
    ) -> RepoResult<Note> {
        let note_id = NoteId::parse(id).ok_or(RepoError::NotFound)?;
        let mut stmt = self.conn.prepare(
            "UPDATE notes
             SET
                title = COALESCE(?2, title),
                content = COALESCE(?3, content),
                updated_at = MAX(?4, updated_at + 1)
             WHERE id = ?1
             RETURNING
                id,
                title,
                content,
                created_at,
                updated_at,
                expires_at,
                NULL AS score;",
        )?;

        let mut rows = stmt.query(params![note_id.as_raw(), title, content, now_epoch_ms()])?;
        match rows.next()? {
            Some(row) => parse_note_row(row),
            None => Err(RepoError::NotFound),
        }
    }

    fn delete_note(&self, id: &str) -> RepoResult<()> {
        let note_id = NoteId::parse(id).ok_or(RepoError::NotFound)?;
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [note_id.as_raw()])?;

        if changed == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }

    fn collect_notes(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();

        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }

        Ok(notes)
    }
}

impl NotesRepository for SqliteNotesRepository<'_> {
    fn create_with_expiry(
        &self,
        title: &str,
        content: &str,
        expires_at: Option<i64>,
    ) -> RepoResult<Note> {
        let started_at = Instant::now();
        let result = self.insert_note(title, content, expires_at);
        log_outcome("note_create", started_at, &result);
        result
    }

    fn by_id(&self, id: &str) -> RepoResult<Note> {
        let started_at = Instant::now();
        let result = self.find_note(id);
        log_outcome("note_get", started_at, &result);
        result
    }

    fn list(&self, query: &str, limit: i64, skip: i64) -> RepoResult<Vec<Note>> {
        let started_at = Instant::now();
        let result = self.query_page(query, limit, skip);
        log_outcome("note_list", started_at, &result);
        result
    }

    fn list_after(&self, query: &str, after_id: &str, limit: i64) -> RepoResult<Vec<Note>> {
        let started_at = Instant::now();
        let result = self.query_after(query, after_id, limit);
        log_outcome("note_list_after", started_at, &result);
        result
    }

    fn stats(&self) -> RepoResult<NoteStats> {
        let started_at = Instant::now();
        let result = self.aggregate_stats();
        log_outcome("note_stats", started_at, &result);
        result
    }

    fn update(&self, id: &str, title: Option<&str>, content: Option<&str>) -> RepoResult<Note> {
        let started_at = Instant::now();
        let result = self.update_note(id, title, content);
        log_outcome("note_update", started_at, &result);
        result
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.delete_note(id);
        log_outcome("note_delete", started_at, &result);
        result
    }
}

/// Maps the caller's limit onto SQLite `LIMIT`, where `-1` means unlimited.
fn effective_limit(limit: i64) -> i64 {
    if limit == 0 {
        -1
    } else {
        limit.saturating_abs()
    }
}

fn ensure_indexes(conn: &Connection) -> RepoResult<bool> {
    if !table_exists(conn, COLLECTION)? {
        return Err(RepoError::MissingCollection(COLLECTION));
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(CREATE_INDEXES_SQL)?;
    let text_index_created = ensure_text_index(&tx)?;
    tx.commit()?;

    Ok(text_index_created)
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let raw_id: i64 = row.get("id")?;
    let id = NoteId::from_raw(raw_id)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid id `{raw_id}` in notes.id")))?;

    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;
    if updated_at < created_at {
        return Err(RepoError::InvalidData(format!(
            "note {id} has updated_at {updated_at} before created_at {created_at}"
        )));
    }

    Ok(Note {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at,
        updated_at,
        expires_at: row.get("expires_at")?,
        score: row.get("score")?,
    })
}

fn log_outcome<T>(event: &str, started_at: Instant, result: &RepoResult<T>) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => debug!("event={event} module=repo status=ok duration_ms={duration_ms}"),
        Err(err) if err.is_not_found() => debug!(
            "event={event} module=repo status=error duration_ms={duration_ms} error_code=not_found"
        ),
        Err(err) => error!(
            "event={event} module=repo status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
}
