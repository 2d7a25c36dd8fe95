//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record tracked by the review session.
//! - Own the closed set of review statuses and their legacy symbols.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `content` is non-blank and immutable after creation.
//! - `completed == true` if and only if `status == ReviewStatus::Done`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable surrogate identifier assigned when a task is created.
pub type TaskId = Uuid;

/// Review escalation marker, in strict escalation order.
///
/// Ordering follows declaration order, so `a < b` means `a` is earlier in
/// the escalation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Freshly entered, not reviewed yet.
    Blank,
    /// First review done.
    First,
    /// Second review, due 2 hours after the first.
    Second,
    /// Third review, due 12 hours after the second.
    Third,
    /// Fourth review, due 24 hours after the third.
    Fourth,
    /// Archived. Absorbing state.
    Done,
}

impl ReviewStatus {
    /// Every status in escalation order.
    pub const ALL: [ReviewStatus; 6] = [
        ReviewStatus::Blank,
        ReviewStatus::First,
        ReviewStatus::Second,
        ReviewStatus::Third,
        ReviewStatus::Fourth,
        ReviewStatus::Done,
    ];

    /// Legacy single-character marker used in storage and on screen.
    pub fn symbol(self) -> char {
        match self {
            Self::Blank => ' ',
            Self::First => '·',
            Self::Second => '*',
            Self::Third => 'o',
            Self::Fourth => 'x',
            Self::Done => '√',
        }
    }

    /// Decodes a legacy marker. Unknown markers decode to `Blank`.
    pub fn from_symbol(symbol: char) -> Self {
        match symbol {
            '·' => Self::First,
            '*' => Self::Second,
            'o' => Self::Third,
            'x' => Self::Fourth,
            '√' => Self::Done,
            _ => Self::Blank,
        }
    }

    /// Decodes a stored status column; empty text is `Blank`.
    pub fn from_stored(value: &str) -> Self {
        value.chars().next().map_or(Self::Blank, Self::from_symbol)
    }

    /// Human label shown next to the task content.
    pub fn label(self) -> &'static str {
        match self {
            Self::Blank => "",
            Self::First => "1st",
            Self::Second => "2nd",
            Self::Third => "3rd",
            Self::Fourth => "4th",
            Self::Done => "finish",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

impl Display for ReviewStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Blank => "blank",
            Self::First => "first",
            Self::Second => "second",
            Self::Third => "third",
            Self::Fourth => "fourth",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Validation failures for task records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Content is empty or whitespace only.
    EmptyContent,
    /// `completed` disagrees with the terminal status.
    CompletedMismatch {
        status: ReviewStatus,
        completed: bool,
    },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "task content cannot be empty"),
            Self::CompletedMismatch { status, completed } => write!(
                f,
                "completed={completed} is inconsistent with status `{status}`"
            ),
        }
    }
}

impl Error for TaskValidationError {}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Surrogate key used by update paths instead of `content`.
    pub id: TaskId,
    pub content: String,
    pub status: ReviewStatus,
    /// Next escalation instant, or completion instant once `Done`.
    /// Local wall-clock time.
    pub deadline: NaiveDateTime,
    pub completed: bool,
}

impl Task {
    /// Creates a blank-status task due at `now` with a generated ID.
    ///
    /// Content is trimmed before validation.
    ///
    /// # Errors
    /// - Returns `EmptyContent` when the trimmed content is empty.
    pub fn new(content: &str, now: NaiveDateTime) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::new_v4(), content, now)
    }

    /// Creates a blank-status task with a caller-provided ID.
    pub fn with_id(
        id: TaskId,
        content: &str,
        now: NaiveDateTime,
    ) -> Result<Self, TaskValidationError> {
        let task = Self {
            id,
            content: content.trim().to_string(),
            status: ReviewStatus::Blank,
            deadline: now,
            completed: false,
        };
        task.validate()?;
        Ok(task)
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.content.trim().is_empty() {
            return Err(TaskValidationError::EmptyContent);
        }
        if self.completed != self.status.is_terminal() {
            return Err(TaskValidationError::CompletedMismatch {
                status: self.status,
                completed: self.completed,
            });
        }
        Ok(())
    }

    /// Whether the next escalation is past due.
    ///
    /// Informational only; nothing escalates a task automatically.
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        !self.status.is_terminal() && now >= self.deadline
    }
}
