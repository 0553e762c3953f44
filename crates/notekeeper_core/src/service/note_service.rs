//! Note use-case service.
//!
//! # Responsibility
//! - Create notes from raw lines using the shared unique-timestamp source.
//! - Provide text edit, lookup, customer listing, export and import APIs.
//!
//! # Invariants
//! - Notes created here without a timestamp prefix never share a timestamp
//!   with each other or with notes already stored when the service resumed.
//! - Timestamps taken from a line prefix are stored as given and never move
//!   the timestamp source.
//! - Editing replaces the text only; the timestamp is kept.
//! - Exported lines parse back to the same timestamp and text.

use crate::clock::{Clock, UniqueTimestamps};
use crate::model::note::{CustomerId, Note, NoteId};
use crate::repo::note_repo::{NoteListQuery, NoteRepository, RepoError, RepoResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Input line is empty or whitespace only.
    EmptyNote,
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyNote => write!(f, "note text cannot be empty"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Note service facade over a repository and a timestamp source.
pub struct NoteService<R: NoteRepository, C: Clock> {
    repo: R,
    timestamps: UniqueTimestamps<C>,
}

impl<R: NoteRepository, C: Clock> NoteService<R, C> {
    /// Creates a service with a fresh timestamp source.
    pub fn new(repo: R, clock: C) -> Self {
        Self {
            repo,
            timestamps: UniqueTimestamps::new(clock),
        }
    }

    /// Creates a service whose timestamps continue after the latest stored
    /// note, so restarts cannot reissue a persisted timestamp.
    ///
    /// Rows dated beyond the source's observe horizon (imported future-dated
    /// lines) are skipped when choosing the seed.
    pub fn resume(repo: R, clock: C) -> RepoResult<Self> {
        let timestamps = UniqueTimestamps::new(clock);
        let seeded = match repo.latest_timestamp_ms(timestamps.observe_horizon_ms())? {
            Some(latest) => timestamps.observe(latest),
            None => false,
        };
        info!("event=note_service_resume module=service status=ok seeded={seeded}");
        Ok(Self { repo, timestamps })
    }

    /// Parses `raw` and stores it as a note of `customer_id`.
    ///
    /// A missing or malformed timestamp prefix is not an error: the whole
    /// line becomes the text and a unique timestamp is issued.
    pub fn add_note(
        &mut self,
        customer_id: CustomerId,
        raw: &str,
    ) -> Result<Note, NoteServiceError> {
        if raw.trim().is_empty() {
            return Err(NoteServiceError::EmptyNote);
        }

        let mut note = Note::parse(raw, &self.timestamps);
        note.set_customer_id(Some(customer_id));
        self.repo.save_note(&mut note)?;
        Ok(note)
    }

    /// Replaces the text of an existing note.
    pub fn update_text(
        &mut self,
        id: NoteId,
        text: impl Into<String>,
    ) -> Result<Note, NoteServiceError> {
        let mut note = self
            .repo
            .get_note(id)?
            .ok_or(NoteServiceError::NoteNotFound(id))?;
        note.set_text(text);
        self.repo.save_note(&mut note)?;
        Ok(note)
    }

    /// Gets one note by id.
    pub fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        self.repo.get_note(id)
    }

    /// Lists one customer's notes in timestamp order.
    pub fn list_customer_notes(
        &self,
        customer_id: CustomerId,
        limit: Option<u32>,
        offset: u32,
    ) -> RepoResult<Vec<Note>> {
        self.repo.list_notes(&NoteListQuery {
            customer_id: Some(customer_id),
            limit,
            offset,
        })
    }

    /// Deletes one note.
    pub fn delete_note(&mut self, id: NoteId) -> Result<(), NoteServiceError> {
        self.repo.delete_note(id)?;
        Ok(())
    }

    /// Externalizes all notes of a customer, oldest first.
    pub fn export_customer_notes(&self, customer_id: CustomerId) -> RepoResult<Vec<String>> {
        let mut lines = Vec::new();
        let mut offset = 0u32;
        loop {
            let page = self.list_customer_notes(customer_id, None, offset)?;
            if page.is_empty() {
                break;
            }
            offset = offset.saturating_add(page.len() as u32);
            lines.extend(page.iter().map(Note::externalize));
        }
        Ok(lines)
    }

    /// Imports externalized lines for a customer, one note per line.
    ///
    /// Stops at the first failing line; notes stored before it are kept.
    pub fn import_notes<'a, I>(
        &mut self,
        customer_id: CustomerId,
        lines: I,
    ) -> Result<Vec<Note>, NoteServiceError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut imported = Vec::new();
        for (index, line) in lines.into_iter().enumerate() {
            match self.add_note(customer_id, line) {
                Ok(note) => imported.push(note),
                Err(err) => {
                    warn!(
                        "event=note_import module=service status=error customer_id={} line_index={} imported={} error={}",
                        customer_id,
                        index,
                        imported.len(),
                        err
                    );
                    return Err(err);
                }
            }
        }
        info!(
            "event=note_import module=service status=ok customer_id={} imported={}",
            customer_id,
            imported.len()
        );
        Ok(imported)
    }

    pub fn timestamps(&self) -> &UniqueTimestamps<C> {
        &self.timestamps
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn into_repo(self) -> R {
        self.repo
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteService, NoteServiceError};
    use crate::clock::ManualClock;
    use crate::repo::memory_repo::InMemoryNoteRepository;

    #[test]
    fn blank_input_is_rejected() {
        let mut service = NoteService::new(InMemoryNoteRepository::new(), ManualClock::new(0));
        assert!(matches!(
            service.add_note(1, "   "),
            Err(NoteServiceError::EmptyNote)
        ));
    }

    #[test]
    fn prefixed_timestamp_does_not_move_the_source() {
        let mut service = NoteService::new(InMemoryNoteRepository::new(), ManualClock::new(0));
        let imported = service
            .add_note(1, "2018-04-02 10:16:24.868;; imported")
            .unwrap();
        assert_eq!(service.timestamps().last_issued_ms(), None);

        let fresh = service.add_note(1, "fresh").unwrap();
        assert_eq!(imported.timestamp_ms(), 1_522_664_184_868);
        assert_eq!(fresh.timestamp_ms(), 0);
    }

    #[test]
    fn update_text_of_missing_note_is_not_found() {
        let mut service = NoteService::new(InMemoryNoteRepository::new(), ManualClock::new(0));
        assert!(matches!(
            service.update_text(5, "x"),
            Err(NoteServiceError::NoteNotFound(5))
        ));
    }
}
