//! Translate crossterm key events into the wire's key-event string format:
//! a modifier prefix (`C+`, `A+`) followed by a key token — `"a"`,
//! `"Enter"`, `"C+e"`, `"C+Delete"`. The core passes these strings through
//! unchanged; this crate is the only thing that ever looks at a crossterm
//! type.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// `None` for keys with no sensible string form (media keys, lock keys).
pub fn key_event_to_string(event: &KeyEvent) -> Option<String> {
    let token = key_token(&event.code)?;
    let mut prefix = String::new();
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        prefix.push_str("C+");
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        prefix.push_str("A+");
    }
    // Shift only gets a prefix for named keys; shifted letters already
    // arrive as their own uppercase `Char`.
    if event.modifiers.contains(KeyModifiers::SHIFT) && !matches!(event.code, KeyCode::Char(_)) {
        prefix.push_str("S+");
    }
    Some(format!("{prefix}{token}"))
}

fn key_token(code: &KeyCode) -> Option<String> {
    let token = match code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Tab | KeyCode::BackTab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::Insert => "Insert".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        KeyCode::Null
        | KeyCode::CapsLock
        | KeyCode::ScrollLock
        | KeyCode::NumLock
        | KeyCode::PrintScreen
        | KeyCode::Pause
        | KeyCode::Menu
        | KeyCode::KeypadBegin
        | KeyCode::Media(_)
        | KeyCode::Modifier(_) => return None,
    };
    Some(token)
}
