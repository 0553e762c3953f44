//! Core domain logic for customer notes.
//!
//! Notes are short `"yyyy-MM-dd HH:mm:ss.SSS;; text"` lines attached to a
//! customer record. This crate owns parsing, externalizing, unique
//! timestamp issuing and the repository seam; the host application owns
//! customers and everything around them.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock, UniqueTimestamps};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError, LoggingStatus};
pub use model::note::{CustomerId, Note, NoteId, NoteValidationError};
pub use model::note_format::{format_timestamp, parse_timestamp, FIELD_SEPARATOR};
pub use repo::memory_repo::InMemoryNoteRepository;
pub use repo::note_repo::{NoteListQuery, NoteRepository, RepoError, RepoResult, SqliteNoteRepository};
pub use service::note_service::{NoteService, NoteServiceError};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
