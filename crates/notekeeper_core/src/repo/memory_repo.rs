//! In-memory note repository.
//!
//! Used by hosts that own persistence elsewhere and only need the note
//! use-cases, and by tests that should not depend on SQLite.

use crate::model::note::{Note, NoteId};
use crate::repo::note_repo::{
    normalize_note_limit, NoteListQuery, NoteRepository, RepoError, RepoResult,
};
use std::collections::BTreeMap;

/// `BTreeMap`-backed repository with sequential ids starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryNoteRepository {
    notes: BTreeMap<NoteId, Note>,
    last_id: NoteId,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl NoteRepository for InMemoryNoteRepository {
    fn save_note(&mut self, note: &mut Note) -> RepoResult<NoteId> {
        note.validate()?;

        let id = match note.id() {
            Some(id) if self.notes.contains_key(&id) => id,
            Some(id) => return Err(RepoError::NotFound(id)),
            None => {
                self.last_id += 1;
                note.assign_id(self.last_id);
                self.last_id
            }
        };
        self.notes.insert(id, note.clone());
        Ok(id)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        Ok(self.notes.get(&id).cloned())
    }

    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>> {
        let mut matching: Vec<&Note> = self
            .notes
            .values()
            .filter(|note| query.customer_id.is_none() || note.customer_id() == query.customer_id)
            .collect();
        matching.sort_by_key(|note| (note.timestamp_ms(), note.id()));

        Ok(matching
            .into_iter()
            .skip(query.offset as usize)
            .take(normalize_note_limit(query.limit) as usize)
            .cloned()
            .collect())
    }

    fn delete_note(&mut self, id: NoteId) -> RepoResult<()> {
        self.notes
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound(id))
    }

    fn latest_timestamp_ms(&self, not_after_ms: i64) -> RepoResult<Option<i64>> {
        Ok(self
            .notes
            .values()
            .map(Note::timestamp_ms)
            .filter(|timestamp_ms| *timestamp_ms <= not_after_ms)
            .max())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryNoteRepository;
    use crate::model::note::Note;
    use crate::repo::note_repo::{NoteListQuery, NoteRepository, RepoError};

    #[test]
    fn save_assigns_sequential_ids() {
        let mut repo = InMemoryNoteRepository::new();
        let mut first = Note::with_timestamp(10, "a").unwrap();
        let mut second = Note::with_timestamp(20, "b").unwrap();

        assert_eq!(repo.save_note(&mut first).unwrap(), 1);
        assert_eq!(repo.save_note(&mut second).unwrap(), 2);
        assert_eq!(first.id(), Some(1));
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut repo = InMemoryNoteRepository::new();
        let mut first = Note::with_timestamp(10, "a").unwrap();
        repo.save_note(&mut first).unwrap();
        repo.delete_note(1).unwrap();

        let mut second = Note::with_timestamp(20, "b").unwrap();
        assert_eq!(repo.save_note(&mut second).unwrap(), 2);
    }

    #[test]
    fn save_with_unknown_id_is_not_found() {
        let mut repo = InMemoryNoteRepository::new();
        let mut ghost = Note::hydrate(99, 10, "ghost", None).unwrap();
        assert!(matches!(
            repo.save_note(&mut ghost),
            Err(RepoError::NotFound(99))
        ));
        assert!(repo.is_empty());
    }

    #[test]
    fn list_filters_by_customer_and_orders_by_timestamp() {
        let mut repo = InMemoryNoteRepository::new();
        for (ts, customer) in [(30, 1), (10, 1), (20, 2)] {
            let mut note = Note::with_timestamp(ts, format!("t{ts}")).unwrap();
            note.set_customer_id(Some(customer));
            repo.save_note(&mut note).unwrap();
        }

        let query = NoteListQuery {
            customer_id: Some(1),
            ..NoteListQuery::default()
        };
        let listed: Vec<i64> = repo
            .list_notes(&query)
            .unwrap()
            .iter()
            .map(Note::timestamp_ms)
            .collect();
        assert_eq!(listed, vec![10, 30]);
        assert_eq!(repo.latest_timestamp_ms(i64::MAX).unwrap(), Some(30));
        assert_eq!(repo.latest_timestamp_ms(29).unwrap(), Some(20));
    }
}
