//! Domain model for review tasks.
//!
//! # Responsibility
//! - Define canonical data structures used by the lifecycle and session.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`, never by its content.

pub mod task;
