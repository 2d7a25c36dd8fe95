//! Interactive review session.
//!
//! # Responsibility
//! - Own the in-memory list of active tasks, the focus mode and the
//!   selection index.
//! - Apply lifecycle transitions to the selected task and persist them.
//!
//! # Invariants
//! - `selected < tasks.len()` whenever focus is `ListNavigation` and the list
//!   is non-empty; `selected == 0` when the list is empty.
//! - A submitted task is appended only after its insert succeeded.
//! - A task that reaches `Done` leaves the in-memory list immediately and
//!   stays in storage for archival.
//! - A failed update is logged and never rolled back in memory.
//! - No persistence call is retried.

use crate::clock::Clock;
use crate::lifecycle::advance;
use crate::model::task::{ReviewStatus, Task, TaskId};
use crate::repo::task_repo::{RepoError, RepoResult, TaskRepository};
use crate::view::{display_lines, DisplayLine};
use chrono::TimeDelta;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Which interaction mode currently owns keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    TextEntry,
    ListNavigation,
}

/// Selection movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Outcome of one `advance_selected` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub task_id: TaskId,
    pub from: ReviewStatus,
    pub to: ReviewStatus,
    /// The task reached `Done` and left the active list.
    pub removed: bool,
    /// The update reached storage.
    pub persisted: bool,
}

/// Rejected session commands.
#[derive(Debug)]
pub enum SessionError {
    /// Command is not valid in the current focus mode.
    WrongFocus { required: Focus },
    /// Submitted text is empty after trimming.
    EmptyContent,
    /// No task is addressable by the selection.
    NoSelection,
    /// Persistence failure that blocked the command.
    Repo(RepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongFocus { required } => write!(f, "command requires {required:?} focus"),
            Self::EmptyContent => write!(f, "task content cannot be empty"),
            Self::NoSelection => write!(f, "no task selected"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Single-user review session over an owned repository handle.
pub struct Session<R: TaskRepository, C: Clock> {
    repo: R,
    clock: C,
    tasks: Vec<Task>,
    focus: Focus,
    selected: usize,
}

impl<R: TaskRepository, C: Clock> Session<R, C> {
    /// Loads active tasks and starts in text-entry focus.
    ///
    /// # Errors
    /// - Returns repository errors from the initial load.
    pub fn open(repo: R, clock: C) -> RepoResult<Self> {
        let tasks = repo.load_active(clock.now())?;
        info!(
            "event=session_open module=session status=ok active_tasks={}",
            tasks.len()
        );
        Ok(Self::with_tasks(repo, clock, tasks))
    }

    /// Builds a session around an already loaded task list.
    pub fn with_tasks(repo: R, clock: C, tasks: Vec<Task>) -> Self {
        Self {
            repo,
            clock,
            tasks,
            focus: Focus::TextEntry,
            selected: 0,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Task addressed by the selection, if any.
    pub fn selected_task(&self) -> Option<&Task> {
        match self.focus {
            Focus::ListNavigation => self.tasks.get(self.selected),
            Focus::TextEntry => None,
        }
    }

    /// Read-only display snapshot for rendering.
    pub fn display_lines(&self) -> Vec<DisplayLine> {
        display_lines(&self.tasks, self.focus, self.selected, self.clock.now())
    }

    /// Flips focus and returns the new mode.
    ///
    /// Entering list navigation re-clamps the selection into range.
    pub fn toggle_focus(&mut self) -> Focus {
        self.focus = match self.focus {
            Focus::TextEntry => {
                self.clamp_selection();
                Focus::ListNavigation
            }
            Focus::ListNavigation => Focus::TextEntry,
        };
        debug!(
            "event=focus_toggle module=session status=ok focus={:?} selected={}",
            self.focus, self.selected
        );
        self.focus
    }

    /// Moves the selection one step, stopping at either end.
    ///
    /// Returns the resulting selection index.
    pub fn move_selection(&mut self, direction: Direction) -> Result<usize, SessionError> {
        self.require_focus(Focus::ListNavigation)?;

        match direction {
            Direction::Up => self.selected = self.selected.saturating_sub(1),
            Direction::Down => {
                if self.selected + 1 < self.tasks.len() {
                    self.selected += 1;
                }
            }
        }
        Ok(self.selected)
    }

    /// Creates a task from entered text and persists it.
    ///
    /// # Contract
    /// - Content is trimmed; blank content is rejected without side effects.
    /// - The new task has `Blank` status and a deadline of "now".
    /// - The task is appended to the end of the list only after insert
    ///   succeeded.
    pub fn submit_text(&mut self, content: &str) -> Result<TaskId, SessionError> {
        self.require_focus(Focus::TextEntry)?;

        let task = match Task::new(content, self.clock.now()) {
            Ok(task) => task,
            Err(err) => {
                debug!("event=task_submit module=session status=skip reason={err}");
                return Err(SessionError::EmptyContent);
            }
        };

        if let Err(err) = self.repo.insert_task(&task) {
            error!(
                "event=task_submit module=session status=error task_id={} error={err}",
                task.id
            );
            return Err(err.into());
        }

        info!(
            "event=task_submit module=session status=ok task_id={} content_chars={}",
            task.id,
            task.content.chars().count()
        );
        let id = task.id;
        self.tasks.push(task);
        Ok(id)
    }

    /// Escalates the selected task by one status.
    ///
    /// # Contract
    /// - Deadline becomes `now + delay` only when the delay is positive.
    /// - Persistence failure is logged; the in-memory change is kept.
    /// - Reaching `Done` removes the task and re-clamps the selection.
    pub fn advance_selected(&mut self) -> Result<Transition, SessionError> {
        self.require_focus(Focus::ListNavigation)?;

        let now = self.clock.now();
        let index = self.selected;
        let task = self
            .tasks
            .get_mut(index)
            .ok_or(SessionError::NoSelection)?;

        let from = task.status;
        let (to, delay) = advance(from);
        task.status = to;
        task.completed = to.is_terminal();
        if delay > TimeDelta::zero() {
            task.deadline = now + delay;
        }

        let persisted = match self.repo.update_task(task) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=task_advance module=session status=error task_id={} error={err}",
                    task.id
                );
                false
            }
        };

        let task_id = task.id;
        let removed = to.is_terminal();
        if removed {
            self.tasks.remove(index);
            self.clamp_selection();
        }

        info!(
            "event=task_advance module=session status=ok task_id={task_id} from={from} to={to} removed={removed} persisted={persisted}"
        );
        Ok(Transition {
            task_id,
            from,
            to,
            removed,
            persisted,
        })
    }

    /// Ends the session and prunes archived tasks past `retention`.
    ///
    /// Failures are logged and reported as zero removed rows.
    pub fn close(self, retention: TimeDelta) -> usize {
        match self
            .repo
            .prune_terminal_older_than(retention, self.clock.now())
        {
            Ok(removed) => {
                info!("event=session_close module=session status=ok pruned={removed}");
                removed
            }
            Err(err) => {
                warn!("event=session_close module=session status=error error={err}");
                0
            }
        }
    }

    fn require_focus(&self, required: Focus) -> Result<(), SessionError> {
        if self.focus == required {
            Ok(())
        } else {
            Err(SessionError::WrongFocus { required })
        }
    }

    fn clamp_selection(&mut self) {
        self.selected = match self.tasks.len() {
            0 => 0,
            len => self.selected.min(len - 1),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, Focus, Session, SessionError};
    use crate::clock::FixedClock;
    use crate::model::task::{ReviewStatus, Task, TaskId};
    use crate::repo::task_repo::{RepoError, RepoResult, TaskRepository};
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
    use std::cell::{Cell, RefCell};

    /// In-memory store that records writes and can be told to fail.
    #[derive(Default)]
    struct RecordingRepo {
        inserted: RefCell<Vec<Task>>,
        updated: RefCell<Vec<Task>>,
        fail_writes: Cell<bool>,
    }

    impl TaskRepository for RecordingRepo {
        fn load_active(&self, _now: NaiveDateTime) -> RepoResult<Vec<Task>> {
            Ok(Vec::new())
        }

        fn insert_task(&self, task: &Task) -> RepoResult<TaskId> {
            if self.fail_writes.get() {
                return Err(RepoError::InvalidData("disk full".to_string()));
            }
            self.inserted.borrow_mut().push(task.clone());
            Ok(task.id)
        }

        fn update_task(&self, task: &Task) -> RepoResult<()> {
            if self.fail_writes.get() {
                return Err(RepoError::NotFound(task.id));
            }
            self.updated.borrow_mut().push(task.clone());
            Ok(())
        }

        fn prune_terminal_older_than(
            &self,
            _retention: TimeDelta,
            _now: NaiveDateTime,
        ) -> RepoResult<usize> {
            Ok(0)
        }
    }

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .and_then(|date| date.and_hms_opt(9, 0, 0))
            .unwrap()
    }

    fn task_at(content: &str, status: ReviewStatus) -> Task {
        let mut task = Task::new(content, start()).unwrap();
        task.status = status;
        task.completed = status.is_terminal();
        task
    }

    fn session_with<'a>(
        repo: &'a RecordingRepo,
        clock: &'a FixedClock,
        tasks: Vec<Task>,
    ) -> Session<&'a RecordingRepo, &'a FixedClock> {
        Session::with_tasks(repo, clock, tasks)
    }

    #[test]
    fn starts_in_text_entry_with_selection_zero() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let session = session_with(&repo, &clock, Vec::new());
        assert_eq!(session.focus(), Focus::TextEntry);
        assert_eq!(session.selected(), 0);
        assert!(session.selected_task().is_none());
    }

    #[test]
    fn toggle_focus_on_empty_list_resets_selection() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, Vec::new());
        session.selected = 4;

        assert_eq!(session.toggle_focus(), Focus::ListNavigation);
        assert_eq!(session.selected(), 0);
        assert_eq!(session.toggle_focus(), Focus::TextEntry);
    }

    #[test]
    fn toggle_focus_clamps_stale_selection() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let tasks = vec![
            task_at("a", ReviewStatus::First),
            task_at("b", ReviewStatus::First),
        ];
        let mut session = session_with(&repo, &clock, tasks);
        session.selected = 7;

        session.toggle_focus();
        assert_eq!(session.selected(), 1);
    }

    #[test]
    fn move_selection_requires_list_focus() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, vec![task_at("a", ReviewStatus::Blank)]);

        let err = session.move_selection(Direction::Down).unwrap_err();
        assert!(matches!(
            err,
            SessionError::WrongFocus {
                required: Focus::ListNavigation
            }
        ));
    }

    #[test]
    fn move_selection_stays_in_bounds() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        for len in 0..5 {
            let tasks = (0..len)
                .map(|i| task_at(&format!("task {i}"), ReviewStatus::Blank))
                .collect();
            let mut session = session_with(&repo, &clock, tasks);
            session.toggle_focus();

            for _ in 0..(len + 2) {
                let selected = session.move_selection(Direction::Down).unwrap();
                assert!(selected < len.max(1));
            }
            assert_eq!(session.selected(), len.saturating_sub(1));

            for _ in 0..(len + 2) {
                session.move_selection(Direction::Up).unwrap();
            }
            assert_eq!(session.selected(), 0);
        }
    }

    #[test]
    fn submit_rejects_blank_text() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, Vec::new());

        for input in ["", "   ", "\t\n"] {
            assert!(matches!(
                session.submit_text(input),
                Err(SessionError::EmptyContent)
            ));
        }
        assert!(session.tasks().is_empty());
        assert!(repo.inserted.borrow().is_empty());
    }

    #[test]
    fn submit_appends_trimmed_blank_task_at_submission_time() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, vec![task_at("older", ReviewStatus::Second)]);

        let id = session.submit_text(" hello ").unwrap();

        assert_eq!(session.tasks().len(), 2);
        let added = &session.tasks()[1];
        assert_eq!(added.id, id);
        assert_eq!(added.content, "hello");
        assert_eq!(added.status, ReviewStatus::Blank);
        assert_eq!(added.deadline, start());
        assert!(!added.completed);
        assert_eq!(repo.inserted.borrow().as_slice(), &[added.clone()]);
    }

    #[test]
    fn submit_does_not_append_when_insert_fails() {
        let repo = RecordingRepo::default();
        repo.fail_writes.set(true);
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, Vec::new());

        let err = session.submit_text("hello").unwrap_err();
        assert!(matches!(err, SessionError::Repo(_)));
        assert!(session.tasks().is_empty());
    }

    #[test]
    fn submit_requires_text_focus() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, Vec::new());
        session.toggle_focus();

        assert!(matches!(
            session.submit_text("hello"),
            Err(SessionError::WrongFocus {
                required: Focus::TextEntry
            })
        ));
    }

    #[test]
    fn first_advance_keeps_deadline() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, vec![task_at("a", ReviewStatus::Blank)]);
        session.toggle_focus();
        clock.advance(TimeDelta::minutes(30));

        let transition = session.advance_selected().unwrap();
        assert_eq!(transition.from, ReviewStatus::Blank);
        assert_eq!(transition.to, ReviewStatus::First);
        assert!(transition.persisted);
        assert_eq!(session.tasks()[0].deadline, start());
    }

    #[test]
    fn later_advances_move_deadline_from_now() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, vec![task_at("a", ReviewStatus::First)]);
        session.toggle_focus();
        clock.advance(TimeDelta::minutes(30));

        session.advance_selected().unwrap();
        let task = &session.tasks()[0];
        assert_eq!(task.status, ReviewStatus::Second);
        assert_eq!(
            task.deadline,
            start() + TimeDelta::minutes(30) + TimeDelta::hours(2)
        );
        assert_eq!(repo.updated.borrow().last(), Some(task));
    }

    #[test]
    fn advance_requires_list_focus_and_a_task() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, Vec::new());

        assert!(matches!(
            session.advance_selected(),
            Err(SessionError::WrongFocus { .. })
        ));

        session.toggle_focus();
        assert!(matches!(
            session.advance_selected(),
            Err(SessionError::NoSelection)
        ));
        assert!(repo.updated.borrow().is_empty());
    }

    #[test]
    fn failed_update_keeps_in_memory_change() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, vec![task_at("a", ReviewStatus::Second)]);
        session.toggle_focus();
        repo.fail_writes.set(true);

        let transition = session.advance_selected().unwrap();
        assert!(!transition.persisted);
        assert_eq!(session.tasks()[0].status, ReviewStatus::Third);
    }

    #[test]
    fn reaching_done_removes_task_and_keeps_selection_valid() {
        let clock = FixedClock::new(start());
        for len in 1..=5 {
            for position in 0..len {
                let repo = RecordingRepo::default();
                let tasks = (0..len)
                    .map(|i| task_at(&format!("task {i}"), ReviewStatus::Fourth))
                    .collect::<Vec<_>>();
                let target = tasks[position].id;
                let mut session = session_with(&repo, &clock, tasks);
                session.toggle_focus();
                for _ in 0..position {
                    session.move_selection(Direction::Down).unwrap();
                }

                let transition = session.advance_selected().unwrap();
                assert!(transition.removed);
                assert_eq!(transition.task_id, target);
                assert_eq!(session.tasks().len(), len - 1);
                assert!(session.tasks().iter().all(|task| task.id != target));
                if session.tasks().is_empty() {
                    assert_eq!(session.selected(), 0);
                } else {
                    assert!(session.selected() < session.tasks().len());
                }

                let stored = repo.updated.borrow();
                let stored = stored.last().unwrap();
                assert_eq!(stored.status, ReviewStatus::Done);
                assert!(stored.completed);
                assert_eq!(stored.deadline, start() + TimeDelta::days(7));
            }
        }
    }

    #[test]
    fn advancing_second_of_two_tasks_to_done() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let a = task_at("A", ReviewStatus::First);
        let b = task_at("B", ReviewStatus::First);
        let mut session = session_with(&repo, &clock, vec![a.clone(), b]);
        session.toggle_focus();
        session.move_selection(Direction::Down).unwrap();

        for expected in [
            ReviewStatus::Second,
            ReviewStatus::Third,
            ReviewStatus::Fourth,
        ] {
            session.advance_selected().unwrap();
            assert_eq!(session.tasks()[1].status, expected);
            assert_eq!(session.tasks()[0], a);
        }

        let transition = session.advance_selected().unwrap();
        assert!(transition.removed);
        assert_eq!(session.tasks(), &[a]);
        assert_eq!(session.selected(), 0);
    }

    #[test]
    fn elapsed_deadline_does_not_escalate_on_its_own() {
        let repo = RecordingRepo::default();
        let clock = FixedClock::new(start());
        let mut session = session_with(&repo, &clock, vec![task_at("a", ReviewStatus::First)]);

        clock.advance(TimeDelta::days(30));
        session.toggle_focus();
        session.move_selection(Direction::Down).unwrap();

        assert_eq!(session.tasks()[0].status, ReviewStatus::First);
        assert!(session.tasks()[0].is_overdue(start() + TimeDelta::days(30)));
        assert!(repo.updated.borrow().is_empty());
    }
}
