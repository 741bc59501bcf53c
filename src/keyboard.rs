//! Keyboard shortcuts for the editor.
//!
//! Undo is Ctrl+Z (Cmd+Z on macOS); redo is Ctrl+Shift+Z or Ctrl+Y
//! (Cmd+Shift+Z on macOS). While a text field has focus only Escape reaches
//! the editor; everything else belongs to the field.

use serde::{Deserialize, Serialize};

/// Which modifier acts as the command key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Mac,
    Other,
}

impl Platform {
    /// Platform this binary was built for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Mac
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    /// The platform command modifier alone
    pub fn command(platform: Platform) -> Self {
        match platform {
            Platform::Mac => Self {
                meta: true,
                ..Self::NONE
            },
            Platform::Other => Self {
                ctrl: true,
                ..Self::NONE
            },
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    fn command_held(&self, platform: Platform) -> bool {
        match platform {
            Platform::Mac => self.meta && !self.ctrl,
            Platform::Other => self.ctrl && !self.meta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    Delete,
    Backspace,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Other,
}

/// What had keyboard focus when the key was pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusTarget {
    Canvas,
    TextEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub focus: FocusTarget,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers, focus: FocusTarget) -> Self {
        Self {
            key,
            modifiers,
            focus,
        }
    }

    /// Unmodified key press on the canvas
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE, FocusTarget::Canvas)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorCommand {
    Undo,
    Redo,
    DeleteSelection,
    ClearSelection,
    SelectPrevious,
    SelectNext,
}

/// Map a key press to an editor command, if it is bound to one
pub fn resolve(event: &KeyEvent, platform: Platform) -> Option<EditorCommand> {
    if event.key == Key::Escape {
        return Some(EditorCommand::ClearSelection);
    }

    if event.focus == FocusTarget::TextEntry {
        return None;
    }

    let mods = event.modifiers;
    if mods.command_held(platform) && !mods.alt {
        return match event.key {
            Key::Char(c) if c.eq_ignore_ascii_case(&'z') => Some(if mods.shift {
                EditorCommand::Redo
            } else {
                EditorCommand::Undo
            }),
            Key::Char(c) if c.eq_ignore_ascii_case(&'y') && !mods.shift => {
                Some(EditorCommand::Redo)
            }
            _ => None,
        };
    }

    if mods != Modifiers::NONE {
        return None;
    }

    match event.key {
        Key::Delete | Key::Backspace => Some(EditorCommand::DeleteSelection),
        Key::ArrowUp | Key::ArrowLeft => Some(EditorCommand::SelectPrevious),
        Key::ArrowDown | Key::ArrowRight => Some(EditorCommand::SelectNext),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(key: Key, platform: Platform) -> KeyEvent {
        KeyEvent::new(key, Modifiers::command(platform), FocusTarget::Canvas)
    }

    #[test]
    fn test_undo_redo_other() {
        let p = Platform::Other;
        assert_eq!(resolve(&command(Key::Char('z'), p), p), Some(EditorCommand::Undo));
        assert_eq!(resolve(&command(Key::Char('y'), p), p), Some(EditorCommand::Redo));

        let shifted = KeyEvent::new(Key::Char('Z'), Modifiers::command(p).with_shift(), FocusTarget::Canvas);
        assert_eq!(resolve(&shifted, p), Some(EditorCommand::Redo));
    }

    #[test]
    fn test_undo_redo_mac() {
        let p = Platform::Mac;
        assert_eq!(resolve(&command(Key::Char('z'), p), p), Some(EditorCommand::Undo));

        let shifted = KeyEvent::new(Key::Char('z'), Modifiers::command(p).with_shift(), FocusTarget::Canvas);
        assert_eq!(resolve(&shifted, p), Some(EditorCommand::Redo));

        // Ctrl is not the command key on macOS
        let ctrl_z = command(Key::Char('z'), Platform::Other);
        assert_eq!(resolve(&ctrl_z, p), None);
        assert_eq!(resolve(&command(Key::Char('y'), p), p), Some(EditorCommand::Redo));
        assert_eq!(resolve(&command(Key::Char('y'), Platform::Other), p), None);
    }

    #[test]
    fn test_text_entry_suppresses_shortcuts() {
        let p = Platform::Other;
        let mut event = command(Key::Char('z'), p);
        event.focus = FocusTarget::TextEntry;
        assert_eq!(resolve(&event, p), None);

        let backspace = KeyEvent::new(Key::Backspace, Modifiers::NONE, FocusTarget::TextEntry);
        assert_eq!(resolve(&backspace, p), None);

        let escape = KeyEvent::new(Key::Escape, Modifiers::NONE, FocusTarget::TextEntry);
        assert_eq!(resolve(&escape, p), Some(EditorCommand::ClearSelection));
    }

    #[test]
    fn test_plain_keys() {
        let p = Platform::Other;
        assert_eq!(resolve(&KeyEvent::plain(Key::Delete), p), Some(EditorCommand::DeleteSelection));
        assert_eq!(resolve(&KeyEvent::plain(Key::ArrowUp), p), Some(EditorCommand::SelectPrevious));
        assert_eq!(resolve(&KeyEvent::plain(Key::ArrowDown), p), Some(EditorCommand::SelectNext));
        assert_eq!(resolve(&KeyEvent::plain(Key::Char('z')), p), None);

        let shift_delete = KeyEvent::new(Key::Delete, Modifiers::NONE.with_shift(), FocusTarget::Canvas);
        assert_eq!(resolve(&shift_delete, p), None);
    }
}
