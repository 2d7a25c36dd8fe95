//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the storage contract the review session depends on: load active
//!   tasks, insert, update by id, prune archived tasks.
//! - Own the text encoding of statuses and deadlines.
//!
//! # Invariants
//! - Write paths call `Task::validate()` before SQL mutations.
//! - Active listing is ordered newest first: `created_at DESC, rowid DESC`.
//! - A malformed stored deadline never fails a load; it decodes to `now`.
//! - Deadlines are stored with minute granularity.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::task::{ReviewStatus, Task, TaskId, TaskValidationError};
use chrono::{Datelike, NaiveDateTime, TimeDelta};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Storage format for deadlines, local wall-clock time.
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M";

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    content,
    status,
    deadline,
    completed
FROM tasks";

const REQUIRED_COLUMNS: [&str; 6] = [
    "uuid",
    "content",
    "status",
    "deadline",
    "completed",
    "created_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "task repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "task repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "task repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract required by the review session.
pub trait TaskRepository {
    /// Returns every non-terminal task, newest first.
    ///
    /// `now` is substituted for deadlines that cannot be decoded.
    fn load_active(&self, now: NaiveDateTime) -> RepoResult<Vec<Task>>;
    /// Durably stores a new task.
    fn insert_task(&self, task: &Task) -> RepoResult<TaskId>;
    /// Overwrites status, deadline and completed flag of the task with the
    /// same id.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    /// Deletes terminal tasks whose completion instant is older than
    /// `now - retention`. Returns the number of removed rows.
    fn prune_terminal_older_than(
        &self,
        retention: TimeDelta,
        now: NaiveDateTime,
    ) -> RepoResult<usize>;
}

impl<R: TaskRepository + ?Sized> TaskRepository for &R {
    fn load_active(&self, now: NaiveDateTime) -> RepoResult<Vec<Task>> {
        (**self).load_active(now)
    }

    fn insert_task(&self, task: &Task) -> RepoResult<TaskId> {
        (**self).insert_task(task)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        (**self).update_task(task)
    }

    fn prune_terminal_older_than(
        &self,
        retention: TimeDelta,
        now: NaiveDateTime,
    ) -> RepoResult<usize> {
        (**self).prune_terminal_older_than(retention, now)
    }
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not run.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_task_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Fetches one task by id, terminal or not.
    pub fn get_task(&self, id: TaskId, now: NaiveDateTime) -> RepoResult<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("{TASK_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_task_row(row, now)),
            )
            .optional()?;

        task.transpose()
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn load_active(&self, now: NaiveDateTime) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE status != ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([status_to_db(ReviewStatus::Done)])?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            match parse_task_row(row, now) {
                Ok(task) => tasks.push(task),
                // A single damaged row must not hide the rest of the list.
                Err(err) => warn!(
                    "event=task_load module=repo status=skip error_code=invalid_row error={err}"
                ),
            }
        }

        Ok(tasks)
    }

    fn insert_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (
                uuid,
                content,
                status,
                deadline,
                completed
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                task.id.to_string(),
                task.content.as_str(),
                status_to_db(task.status),
                format_deadline(task.deadline),
                task.completed,
            ],
        )?;

        Ok(task.id)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                status = ?1,
                deadline = ?2,
                completed = ?3
             WHERE uuid = ?4;",
            params![
                status_to_db(task.status),
                format_deadline(task.deadline),
                task.completed,
                task.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(task.id));
        }

        Ok(())
    }

    fn prune_terminal_older_than(
        &self,
        retention: TimeDelta,
        now: NaiveDateTime,
    ) -> RepoResult<usize> {
        let cutoff = now - retention;
        let tx = self.conn.unchecked_transaction()?;

        let expired = {
            let mut stmt = tx.prepare("SELECT uuid, deadline FROM tasks WHERE status = ?1;")?;
            let mut rows = stmt.query([status_to_db(ReviewStatus::Done)])?;
            let mut expired = Vec::new();
            while let Some(row) = rows.next()? {
                let uuid: String = row.get(0)?;
                let deadline: String = row.get(1)?;
                match parse_deadline(&deadline, now) {
                    Some(completed_at) if completed_at < cutoff => expired.push(uuid),
                    Some(_) => {}
                    None => warn!(
                        "event=task_prune module=repo status=skip error_code=invalid_deadline task_id={uuid}"
                    ),
                }
            }
            expired
        };

        let mut removed = 0;
        for uuid in &expired {
            removed += tx.execute("DELETE FROM tasks WHERE uuid = ?1;", [uuid])?;
        }
        tx.commit()?;

        Ok(removed)
    }
}

/// Encodes a deadline for storage.
pub fn format_deadline(deadline: NaiveDateTime) -> String {
    deadline.format(DEADLINE_FORMAT).to_string()
}

/// Decodes a stored deadline.
///
/// Accepts the current format and the year-less legacy format, which is
/// placed in the year of `now`. Returns `None` for anything else.
pub fn parse_deadline(value: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, DEADLINE_FORMAT)
        // Earlier releases wrote `MM-DD HH:MM` without a year.
        .or_else(|_| {
            NaiveDateTime::parse_from_str(&format!("{}-{value}", now.year()), DEADLINE_FORMAT)
        })
        .ok()
}

fn parse_task_row(row: &Row<'_>, now: NaiveDateTime) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in tasks.uuid"))
    })?;

    let status_text: String = row.get("status")?;
    let status = ReviewStatus::from_stored(&status_text);

    let deadline_text: String = row.get("deadline")?;
    let deadline = parse_deadline(&deadline_text, now).unwrap_or_else(|| {
        warn!("event=task_load module=repo status=recovered error_code=invalid_deadline task_id={id}");
        now
    });

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in tasks.completed"
            )));
        }
    };

    let task = Task {
        id,
        content: row.get("content")?,
        status,
        deadline,
        completed,
    };
    task.validate()?;
    Ok(task)
}

fn status_to_db(status: ReviewStatus) -> String {
    status.symbol().to_string()
}

fn ensure_task_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "tasks")? {
        return Err(RepoError::MissingRequiredTable("tasks"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "tasks", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "tasks",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
