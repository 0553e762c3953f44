//! Note domain model.
//!
//! # Responsibility
//! - Define the short, timestamped text line attached to a customer.
//! - Parse notes from, and externalize them to, the `"timestamp;; text"`
//!   line format.
//!
//! # Invariants
//! - `timestamp_ms` stays inside the four-digit-year range of the line
//!   format, so `externalize()` output always parses back to the same note.
//! - Text is the only content field mutated after construction.
//! - `id` is assigned by a repository and never invented by the model.

use crate::clock::{Clock, SystemClock, UniqueTimestamps};
use crate::model::note_format::{
    is_formattable, join_note_str, split_note_str, MAX_TIMESTAMP_MS, MIN_TIMESTAMP_MS,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Repository-assigned note identifier.
pub type NoteId = i64;

/// Identifier of the owning customer record in the host application.
pub type CustomerId = i64;

/// Validation errors for note invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Timestamp cannot be rendered with a four-digit year.
    TimestampOutOfRange(i64),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimestampOutOfRange(value) => write!(
                f,
                "note timestamp {value} is outside {MIN_TIMESTAMP_MS}..={MAX_TIMESTAMP_MS}"
            ),
        }
    }
}

impl Error for NoteValidationError {}

/// Short text line with a unique timestamp, owned by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NoteWire", into = "NoteWire")]
pub struct Note {
    id: Option<NoteId>,
    timestamp_ms: i64,
    text: String,
    customer_id: Option<CustomerId>,
}

impl Note {
    /// Parses a note from a raw `"timestamp;; text"` line.
    ///
    /// When the line has no separator, or the prefix is not a valid
    /// timestamp, the whole input becomes the text and `timestamps` issues a
    /// fresh unique timestamp. This never fails.
    pub fn parse<C: Clock>(raw: &str, timestamps: &UniqueTimestamps<C>) -> Self {
        let (parsed, text) = split_note_str(raw);
        let timestamp_ms = match parsed {
            Some(value) => value,
            None => {
                let issued = timestamps.next_unique_ms();
                debug!(
                    "event=note_parse module=model status=generated_timestamp input_len={} issued_ms={}",
                    raw.len(),
                    issued
                );
                issued
            }
        };

        Self {
            id: None,
            timestamp_ms,
            text: text.to_string(),
            customer_id: None,
        }
    }

    /// Creates an unsaved note with an explicit timestamp.
    ///
    /// # Errors
    /// - Returns `TimestampOutOfRange` when `timestamp_ms` cannot be
    ///   externalized.
    pub fn with_timestamp(
        timestamp_ms: i64,
        text: impl Into<String>,
    ) -> Result<Self, NoteValidationError> {
        let note = Self {
            id: None,
            timestamp_ms,
            text: text.into(),
            customer_id: None,
        };
        note.validate()?;
        Ok(note)
    }

    /// Rebuilds a stored note without consulting any clock.
    pub fn hydrate(
        id: NoteId,
        timestamp_ms: i64,
        text: impl Into<String>,
        customer_id: Option<CustomerId>,
    ) -> Result<Self, NoteValidationError> {
        let note = Self {
            id: Some(id),
            timestamp_ms,
            text: text.into(),
            customer_id,
        };
        note.validate()?;
        Ok(note)
    }

    /// Checks model invariants before persistence or after loading.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if !is_formattable(self.timestamp_ms) {
            return Err(NoteValidationError::TimestampOutOfRange(self.timestamp_ms));
        }
        Ok(())
    }

    /// Renders the note as `"yyyy-MM-dd HH:mm:ss.SSS;; text"`.
    pub fn externalize(&self) -> String {
        join_note_str(self.timestamp_ms, &self.text)
    }

    pub fn id(&self) -> Option<NoteId> {
        self.id
    }

    /// Records the repository-assigned id.
    pub(crate) fn assign_id(&mut self, id: NoteId) {
        self.id = Some(id);
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text section; the timestamp is kept.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn set_customer_id(&mut self, customer_id: Option<CustomerId>) {
        self.customer_id = customer_id;
    }
}

impl Default for Note {
    /// Empty note stamped with the current wall clock, used for hydration
    /// by callers that fill fields afterwards.
    fn default() -> Self {
        let now = SystemClock.now_epoch_ms();
        Self {
            id: None,
            timestamp_ms: now.clamp(MIN_TIMESTAMP_MS, MAX_TIMESTAMP_MS),
            text: String::new(),
            customer_id: None,
        }
    }
}

impl Display for Note {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.externalize())
    }
}

#[derive(Serialize, Deserialize)]
struct NoteWire {
    id: Option<NoteId>,
    timestamp_ms: i64,
    text: String,
    customer_id: Option<CustomerId>,
}

impl TryFrom<NoteWire> for Note {
    type Error = NoteValidationError;

    fn try_from(value: NoteWire) -> Result<Self, Self::Error> {
        let note = Self {
            id: value.id,
            timestamp_ms: value.timestamp_ms,
            text: value.text,
            customer_id: value.customer_id,
        };
        note.validate()?;
        Ok(note)
    }
}

impl From<Note> for NoteWire {
    fn from(value: Note) -> Self {
        Self {
            id: value.id,
            timestamp_ms: value.timestamp_ms,
            text: value.text,
            customer_id: value.customer_id,
        }
    }
}
