//! Domain model for customer notes.
//!
//! # Responsibility
//! - Define the note value object and its externalized line format.
//! - Keep the model free of storage and framework concerns.
//!
//! # Invariants
//! - Relations to customers are plain ids; loading the customer itself is
//!   the host application's job.

pub mod note;
pub mod note_format;
