//! Display-line projection of the session for renderers.
//!
//! Renderers only ever see these snapshots; nothing here writes back into
//! the session.

use crate::model::task::Task;
use crate::service::session::Focus;
use chrono::NaiveDateTime;

/// Column width reserved for task content.
pub const CONTENT_WIDTH: usize = 30;
const LABEL_WIDTH: usize = 8;

/// One rendered task row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    /// Full row text including the selection gutter.
    pub text: String,
    pub highlighted: bool,
    pub overdue: bool,
}

/// Formats one task as `[s] content label MM-DD HH:MM`.
pub fn render_task(task: &Task) -> String {
    format!(
        "[{}] {} {:<label$} {} {}",
        task.status.symbol(),
        fit_to_width(&task.content, CONTENT_WIDTH),
        task.status.label(),
        task.deadline.format("%m-%d"),
        task.deadline.format("%H:%M"),
        label = LABEL_WIDTH,
    )
}

/// Builds the display snapshot. The selected row gets a `> ` gutter only
/// while list navigation has focus.
pub fn display_lines(
    tasks: &[Task],
    focus: Focus,
    selected: usize,
    now: NaiveDateTime,
) -> Vec<DisplayLine> {
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let highlighted = focus == Focus::ListNavigation && index == selected;
            let gutter = if highlighted { "> " } else { "  " };
            DisplayLine {
                text: format!("{gutter}{}", render_task(task)),
                highlighted,
                overdue: task.is_overdue(now),
            }
        })
        .collect()
}

fn fit_to_width(value: &str, width: usize) -> String {
    let mut fitted: String = value.chars().take(width).collect();
    let len = fitted.chars().count();
    fitted.extend(std::iter::repeat(' ').take(width - len));
    fitted
}
