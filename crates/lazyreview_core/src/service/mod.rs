//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate lifecycle transitions and repository calls for the
//!   interactive session.
//! - Keep terminal UI code decoupled from storage details.

pub mod session;
