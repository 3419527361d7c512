use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Event utility functions
pub mod event_utils {
    use super::*;

    /// Check if a key event matches Ctrl+C or Ctrl+Q (terminate)
    pub fn is_terminate_event(event: &Event) -> bool {
        matches!(
            event,
            Event::Key(KeyEvent {
                code: KeyCode::Char('c') | KeyCode::Char('q'),
                modifiers: KeyModifiers::CONTROL,
                ..
            })
        )
    }

    /// Key releases are reported on some platforms; only presses drive the UI
    pub fn is_key_press(key: &KeyEvent) -> bool {
        key.kind != KeyEventKind::Release
    }

    /// The ':' key that opens command mode
    pub fn is_command_key(key: &KeyEvent) -> bool {
        key.code == KeyCode::Char(':')
            && !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    }
}

#[cfg(test)]
mod tests {
    use super::event_utils::*;
    use super::*;

    #[test]
    fn test_terminate_keys() {
        let ctrl_q = Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL));
        let plain_q = Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(is_terminate_event(&ctrl_q));
        assert!(!is_terminate_event(&plain_q));
    }

    #[test]
    fn test_command_key() {
        assert!(is_command_key(&KeyEvent::new(KeyCode::Char(':'), KeyModifiers::SHIFT)));
        assert!(!is_command_key(&KeyEvent::new(KeyCode::Char(':'), KeyModifiers::ALT)));
    }
}
