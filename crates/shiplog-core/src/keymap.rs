use crate::editor::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Delete,
    Backspace,
    Other,
}

/// A key press as reported by the UI shell. `modifier` is Ctrl, or Cmd on
/// macOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: Key,
    pub modifier: bool,
    pub shift: bool,
}

impl KeyChord {
    pub fn plain(key: Key) -> Self {
        KeyChord {
            key,
            modifier: false,
            shift: false,
        }
    }

    pub fn with_modifier(key: Key) -> Self {
        KeyChord {
            key,
            modifier: true,
            shift: false,
        }
    }

    pub fn shifted(mut self) -> Self {
        self.shift = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Undo,
    Redo,
    DeleteSelection,
    AddNode,
}

impl Command {
    pub fn action(self) -> Action {
        match self {
            Command::Undo => Action::Undo,
            Command::Redo => Action::Redo,
            Command::DeleteSelection => Action::DeleteSelection,
            Command::AddNode => Action::AddNode,
        }
    }
}

/// Resolve a chord. Deletion and node creation are suppressed while a text
/// field has focus so typing is not hijacked.
pub fn command_for(chord: KeyChord, text_focused: bool) -> Option<Command> {
    let key = match chord.key {
        Key::Char(c) => Key::Char(c.to_ascii_lowercase()),
        other => other,
    };
    if chord.modifier {
        return match key {
            Key::Char('z') if chord.shift => Some(Command::Redo),
            Key::Char('z') => Some(Command::Undo),
            Key::Char('y') => Some(Command::Redo),
            _ => None,
        };
    }
    if text_focused {
        return None;
    }
    match key {
        Key::Delete | Key::Backspace => Some(Command::DeleteSelection),
        Key::Char('n') => Some(Command::AddNode),
        _ => None,
    }
}
