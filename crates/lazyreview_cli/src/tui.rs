//! Interactive terminal front end.
//!
//! # Responsibility
//! - Translate key presses into session commands.
//! - Draw read-only snapshots of the session.
//!
//! # Invariants
//! - All task and selection mutations go through `Session`.
//! - The terminal is restored even when the event loop fails.

use crate::input::{map_key, InputBuffer, UiCommand};
use chrono::TimeDelta;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use lazyreview_core::{Clock, Focus, Session, SessionError, TaskRepository};
use log::debug;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
use std::io::{self, stdout, Stdout};
use std::time::Duration;

const WINDOW_TITLE: &str = "lazyreview";
const PROMPT: &str = "➜ ";
const PLACEHOLDER: &str = "todo...";
const LEGEND: &str = "schedule: [·] first pass  [*] 2h  [o] 12h  [x] 24h  [√] 7d";
const KEY_HELP: &str =
    "Tab switch pane | Enter add | Ctrl+Y advance | ↑↓ select | Ctrl+C/Esc quit";
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// UI state wrapped around a review session.
pub struct App<R: TaskRepository, C: Clock> {
    session: Session<R, C>,
    input: InputBuffer,
    notice: Option<String>,
}

impl<R: TaskRepository, C: Clock> App<R, C> {
    pub fn new(session: Session<R, C>) -> Self {
        Self {
            session,
            input: InputBuffer::default(),
            notice: None,
        }
    }

    pub fn session(&self) -> &Session<R, C> {
        &self.session
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn into_session(self) -> Session<R, C> {
        self.session
    }

    /// Applies one command. Returns `true` when the app should exit.
    pub fn handle(&mut self, command: UiCommand) -> bool {
        match command {
            UiCommand::Quit => return true,
            UiCommand::ToggleFocus => {
                self.session.toggle_focus();
            }
            UiCommand::Submit => self.submit(),
            UiCommand::Advance => self.advance(),
            UiCommand::Move(direction) => {
                // Arrow keys are inert while typing.
                let _ = self.session.move_selection(direction);
            }
            UiCommand::Insert(ch) => {
                if self.session.focus() == Focus::TextEntry {
                    self.input.push(ch);
                }
            }
            UiCommand::Backspace => {
                if self.session.focus() == Focus::TextEntry {
                    self.input.pop();
                }
            }
        }
        false
    }

    fn submit(&mut self) {
        match self.session.submit_text(self.input.value()) {
            Ok(_) => {
                self.input.clear();
                self.notice = None;
            }
            Err(SessionError::Repo(err)) => {
                // Input is kept so the user can retry.
                self.notice = Some(format!("task not saved: {err}"));
            }
            Err(err) => debug!("event=ui_submit module=tui status=skip reason={err}"),
        }
    }

    fn advance(&mut self) {
        match self.session.advance_selected() {
            Ok(transition) if !transition.persisted => {
                self.notice = Some("status changed but could not be saved".to_string());
            }
            Ok(_) => self.notice = None,
            Err(err) => debug!("event=ui_advance module=tui status=skip reason={err}"),
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if !event::poll(POLL_INTERVAL)? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(command) = map_key(key) {
                    if self.handle(command) {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let [list_area, input_area, help_area] = Layout::vertical([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .areas(frame.area());

        let focus = self.session().focus();
        let items: Vec<ListItem> = self
            .session
            .display_lines()
            .into_iter()
            .map(|line| {
                let mut style = Style::default();
                if line.overdue {
                    style = style.fg(Color::Red);
                }
                if line.highlighted {
                    style = style.fg(Color::Magenta).add_modifier(Modifier::BOLD);
                }
                ListItem::new(line.text).style(style)
            })
            .collect();

        // Follow the selection while navigating, the newest row while typing.
        let mut list_state = ListState::default();
        let anchor = match focus {
            Focus::ListNavigation => self.session().selected(),
            Focus::TextEntry => items.len().saturating_sub(1),
        };
        if !items.is_empty() {
            list_state.select(Some(anchor));
        }
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(
            match focus {
                Focus::ListNavigation => " tasks (navigating) ",
                Focus::TextEntry => " tasks ",
            },
        ));
        frame.render_stateful_widget(list, list_area, &mut list_state);

        let entry = if self.input().is_empty() {
            Line::from(vec![
                Span::raw(PROMPT),
                Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)),
            ])
        } else {
            Line::from(vec![Span::raw(PROMPT), Span::raw(self.input().value())])
        };
        let entry_title = self.notice().unwrap_or(" new task ");
        frame.render_widget(
            Paragraph::new(entry).block(Block::default().borders(Borders::ALL).title(entry_title)),
            input_area,
        );
        if focus == Focus::TextEntry {
            let offset = PROMPT.chars().count() + self.input().char_count();
            let x = input_area
                .x
                .saturating_add(1)
                .saturating_add(u16::try_from(offset).unwrap_or(u16::MAX));
            let max_x = input_area.right().saturating_sub(2);
            frame.set_cursor_position((x.min(max_x), input_area.y + 1));
        }

        frame.render_widget(
            Paragraph::new(vec![Line::from(LEGEND), Line::from(KEY_HELP)])
                .style(Style::default().fg(Color::Gray)),
            help_area,
        );
    }
}

/// Runs the interactive UI until the user quits, then prunes archived tasks.
///
/// Returns the number of pruned tasks.
pub fn run<R: TaskRepository, C: Clock>(
    session: Session<R, C>,
    retention: TimeDelta,
) -> io::Result<usize> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(session);
    let outcome = app.event_loop(&mut terminal);
    let restored = teardown_terminal(&mut terminal);
    let pruned = app.into_session().close(retention);
    outcome?;
    restored?;
    Ok(pruned)
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, SetTitle(WINDOW_TITLE))?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}
