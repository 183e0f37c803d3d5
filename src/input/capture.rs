//! Mapping from terminal events to normalized inputs

use super::{Direction, InputEvent, ResponseKey};
use crossterm::event::{Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};

/// Map a terminal key to a response key.
///
/// Arrow keys and the home-row `f`/`j` pair give left/right; space and enter
/// give the generic response.
pub fn key_from_terminal(code: KeyCode) -> Option<ResponseKey> {
    match code {
        KeyCode::Left => Some(ResponseKey::Left),
        KeyCode::Right => Some(ResponseKey::Right),
        KeyCode::Char('f') | KeyCode::Char('F') => Some(ResponseKey::Left),
        KeyCode::Char('j') | KeyCode::Char('J') => Some(ResponseKey::Right),
        KeyCode::Char(' ') | KeyCode::Enter => Some(ResponseKey::Space),
        _ => None,
    }
}

/// Which half of the screen a pointer column falls in
pub fn pointer_side(column: u16, width: u16) -> Direction {
    if u32::from(column) * 2 < u32::from(width) {
        Direction::Left
    } else {
        Direction::Right
    }
}

/// Convert a terminal event captured at `timestamp` into a response input.
///
/// Only presses count: key repeats, releases and mouse moves are dropped so a
/// held key cannot answer two trials.
pub fn from_terminal_event(event: &Event, width: u16, timestamp: f64) -> Option<InputEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            key_from_terminal(key.code).map(|k| InputEvent::keyboard(k, timestamp))
        }
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(InputEvent::pointer(
                pointer_side(mouse.column, width),
                timestamp,
            )),
            MouseEventKind::Down(MouseButton::Right) => Some(InputEvent::click(timestamp)),
            _ => None,
        },
        _ => None,
    }
}
