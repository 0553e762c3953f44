//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide id-based save/get/delete and customer-scoped listing.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `save_note` inserts when the note has no id and updates otherwise.
//! - Lists are ordered by `timestamp_ms ASC, id ASC`.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::note::{CustomerId, Note, NoteId, NoteValidationError};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOTES_DEFAULT_LIMIT: u32 = 50;
const NOTES_LIMIT_MAX: u32 = 500;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    time_ms,
    text,
    customer_id
FROM notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(NoteValidationError),
    Db(DbError),
    NotFound(NoteId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
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

/// Query options for listing notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteListQuery {
    /// Restricts results to one customer when set.
    pub customer_id: Option<CustomerId>,
    /// Maximum rows to return. Defaults to 50 and clamps to 500.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Persistence contract for notes, injected into services.
pub trait NoteRepository {
    /// Inserts a new note (assigning its id) or updates an existing one.
    fn save_note(&mut self, note: &mut Note) -> RepoResult<NoteId>;
    /// Gets one note by id.
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Lists notes in timestamp order using filter + pagination.
    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>>;
    /// Deletes one note permanently.
    fn delete_note(&mut self, id: NoteId) -> RepoResult<()>;
    /// Returns the greatest stored timestamp not after `not_after_ms`.
    fn latest_timestamp_ms(&self, not_after_ms: i64) -> RepoResult<Option<i64>>;
}

/// Normalizes a list limit according to the notes contract.
pub fn normalize_note_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => NOTES_DEFAULT_LIMIT,
        Some(value) => value.min(NOTES_LIMIT_MAX),
    }
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` when the `notes`
    ///   shape does not match.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn save_note(&mut self, note: &mut Note) -> RepoResult<NoteId> {
        note.validate()?;

        match note.id() {
            None => {
                self.conn.execute(
                    "INSERT INTO notes (time_ms, text, customer_id) VALUES (?1, ?2, ?3);",
                    params![note.timestamp_ms(), note.text(), note.customer_id()],
                )?;
                let id = self.conn.last_insert_rowid();
                note.assign_id(id);
                debug!("event=note_insert module=repo status=ok note_id={id}");
                Ok(id)
            }
            Some(id) => {
                let changed = self.conn.execute(
                    "UPDATE notes
                     SET
                        time_ms = ?1,
                        text = ?2,
                        customer_id = ?3
                     WHERE id = ?4;",
                    params![note.timestamp_ms(), note.text(), note.customer_id(), id],
                )?;
                if changed == 0 {
                    return Err(RepoError::NotFound(id));
                }
                debug!("event=note_update module=repo status=ok note_id={id}");
                Ok(id)
            }
        }
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>> {
        let mut sql = format!("{NOTE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(customer_id) = query.customer_id {
            sql.push_str(" AND customer_id = ?");
            bind_values.push(Value::Integer(customer_id));
        }

        sql.push_str(" ORDER BY time_ms ASC, id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_note_limit(query.limit))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn delete_note(&mut self, id: NoteId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        debug!("event=note_delete module=repo status=ok note_id={id}");
        Ok(())
    }

    fn latest_timestamp_ms(&self, not_after_ms: i64) -> RepoResult<Option<i64>> {
        let latest = self.conn.query_row(
            "SELECT MAX(time_ms) FROM notes WHERE time_ms <= ?1;",
            [not_after_ms],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(latest)
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: NoteId = row.get("id")?;
    let timestamp_ms: i64 = row.get("time_ms")?;
    Note::hydrate(id, timestamp_ms, row.get::<_, String>("text")?, row.get("customer_id")?)
        .map_err(|err| RepoError::InvalidData(format!("notes.id={id}: {err}")))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "notes")? {
        return Err(RepoError::MissingRequiredTable("notes"));
    }
    for column in ["id", "time_ms", "text", "customer_id"] {
        if !table_has_column(conn, "notes", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }
    Ok(())
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

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::normalize_note_limit;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(normalize_note_limit(None), 50);
        assert_eq!(normalize_note_limit(Some(0)), 50);
        assert_eq!(normalize_note_limit(Some(7)), 7);
        assert_eq!(normalize_note_limit(Some(10_000)), 500);
    }
}
