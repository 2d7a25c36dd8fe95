//! Review escalation policy.
//!
//! # Responsibility
//! - Map a status to its successor and the deadline offset of that step.
//!
//! # Invariants
//! - Pure: no clock reads, no I/O.
//! - Transitions never move backwards and never skip a status.
//! - `Done` is absorbing and maps to itself with a zero offset.

use crate::model::task::ReviewStatus;
use chrono::TimeDelta;

/// Returns `(next_status, delay)` for one explicit advance.
///
/// The new deadline is `now + delay` when `delay` is positive. A zero delay
/// keeps the existing deadline, which is what `Blank -> First` relies on.
pub fn advance(status: ReviewStatus) -> (ReviewStatus, TimeDelta) {
    match status {
        ReviewStatus::Blank => (ReviewStatus::First, TimeDelta::zero()),
        ReviewStatus::First => (ReviewStatus::Second, TimeDelta::hours(2)),
        ReviewStatus::Second => (ReviewStatus::Third, TimeDelta::hours(12)),
        ReviewStatus::Third => (ReviewStatus::Fourth, TimeDelta::hours(24)),
        ReviewStatus::Fourth => (ReviewStatus::Done, TimeDelta::days(7)),
        ReviewStatus::Done => (ReviewStatus::Done, TimeDelta::zero()),
    }
}
