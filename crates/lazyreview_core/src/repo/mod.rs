//! Repository layer for task persistence.
//!
//! # Responsibility
//! - Define the storage contract the session depends on.
//! - Isolate SQLite query details from session orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Task::validate()` before persistence.
//! - Updates address rows by surrogate id, never by content.

pub mod task_repo;
