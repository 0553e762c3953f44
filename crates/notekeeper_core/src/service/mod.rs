//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate timestamp issuing and repository calls into use-cases.
//! - Keep host layers decoupled from storage details.

pub mod note_service;
