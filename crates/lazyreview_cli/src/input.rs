//! Key mapping and the single-line text entry buffer.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use lazyreview_core::Direction;

/// Maximum characters accepted by the entry box.
pub const INPUT_CHAR_LIMIT: usize = 280;

/// UI command decoded from one key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    ToggleFocus,
    Submit,
    Advance,
    Move(Direction),
    Insert(char),
    Backspace,
    Quit,
}

/// Decodes a key press; `None` for keys with no binding.
pub fn map_key(key: KeyEvent) -> Option<UiCommand> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => Some(UiCommand::Quit),
        KeyCode::Char('c') if ctrl => Some(UiCommand::Quit),
        KeyCode::Char('y') if ctrl => Some(UiCommand::Advance),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(ch) => Some(UiCommand::Insert(ch)),
        KeyCode::Tab => Some(UiCommand::ToggleFocus),
        KeyCode::Enter => Some(UiCommand::Submit),
        KeyCode::Up => Some(UiCommand::Move(Direction::Up)),
        KeyCode::Down => Some(UiCommand::Move(Direction::Down)),
        KeyCode::Backspace => Some(UiCommand::Backspace),
        _ => None,
    }
}

/// Text typed into the entry box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    value: String,
}

impl InputBuffer {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    /// Appends `ch` unless the limit is reached. Returns whether it was kept.
    pub fn push(&mut self, ch: char) -> bool {
        if ch.is_control() || self.char_count() >= INPUT_CHAR_LIMIT {
            return false;
        }
        self.value.push(ch);
        true
    }

    pub fn pop(&mut self) {
        self.value.pop();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }
}
