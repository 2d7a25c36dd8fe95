//! Core domain logic for LazyReview.
//! This crate is the single source of truth for review lifecycle invariants.

pub mod clock;
pub mod db;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod view;

pub use clock::{Clock, FixedClock, SystemClock};
pub use lifecycle::advance;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{ReviewStatus, Task, TaskId, TaskValidationError};
pub use repo::task_repo::{
    format_deadline, parse_deadline, RepoError, RepoResult, SqliteTaskRepository, TaskRepository,
};
pub use service::session::{Direction, Focus, Session, SessionError, Transition};
pub use view::{display_lines, render_task, DisplayLine};

/// Default archival retention window for finished tasks.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
