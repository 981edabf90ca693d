//! Input handling

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Processed input action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Regular character input
    Char(char),
    /// Enter
    Submit,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    /// Move to start of line
    Home,
    /// Move to end of line
    End,
    PageUp,
    PageDown,
    /// Ctrl+U (clear line)
    ClearLine,
    /// Ctrl+W (delete word)
    DeleteWord,
    /// Bracketed paste
    Paste(String),
    /// Esc or Ctrl+C
    Quit,
    /// Ctrl+Z, previous screen
    Back,
    /// Ctrl+S
    Save,
    /// Unknown/unhandled
    Unknown,
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    // Handle Ctrl combinations first
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            KeyCode::Char('z') => Action::Back,
            KeyCode::Char('s') => Action::Save,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            _ => Action::Unknown,
        };
    }

    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Up => Action::Up,
        KeyCode::Down => Action::Down,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Esc => Action::Quit,
        _ => Action::Unknown,
    }
}

/// Convert a crossterm event to an action.
///
/// Key releases are dropped so terminals reporting them do not double input.
pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
            Some(key_to_action(key_event))
        }
        Event::Paste(text) => Some(Action::Paste(text)),
        _ => None,
    }
}
