//! Repository layer for notes.
//!
//! # Responsibility
//! - Define the load/save contract the host application injects.
//! - Provide in-memory and SQLite implementations of that contract.
//!
//! # Invariants
//! - Repository writes enforce `Note::validate()` before persisting.
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   transport errors.

pub mod memory_repo;
pub mod note_repo;
