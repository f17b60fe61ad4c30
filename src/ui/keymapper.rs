//! Key mapping for console input
//!
//! Converts host key events to virtual-key transitions and typed characters
//! for the grid source.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::grid::{KeyInput, ModifierMask};

pub const VK_BACK: u16 = 0x08;
pub const VK_TAB: u16 = 0x09;
pub const VK_RETURN: u16 = 0x0D;
pub const VK_ESCAPE: u16 = 0x1B;
pub const VK_PRIOR: u16 = 0x21;
pub const VK_NEXT: u16 = 0x22;
pub const VK_END: u16 = 0x23;
pub const VK_HOME: u16 = 0x24;
pub const VK_LEFT: u16 = 0x25;
pub const VK_UP: u16 = 0x26;
pub const VK_RIGHT: u16 = 0x27;
pub const VK_DOWN: u16 = 0x28;
pub const VK_INSERT: u16 = 0x2D;
pub const VK_DELETE: u16 = 0x2E;
pub const VK_F1: u16 = 0x70;

impl From<KeyModifiers> for ModifierMask {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = ModifierMask::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= ModifierMask::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= ModifierMask::LEFT_CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= ModifierMask::LEFT_ALT;
        }
        result
    }
}

/// Key mapper for converting key events to console key input
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent to the inputs forwarded to the grid source.
    ///
    /// Only presses (and repeats) produce input; the release half of each
    /// virtual key is emitted right after its press.
    pub fn map(event: &KeyEvent) -> Vec<KeyInput> {
        if event.kind == KeyEventKind::Release {
            return Vec::new();
        }
        let mods = ModifierMask::from(event.modifiers);

        match event.code {
            KeyCode::Char(ch) => vec![Self::map_char(ch, mods)],

            // Keys that also type a control character
            KeyCode::Enter => Self::typed_key(VK_RETURN, '\r', mods),
            KeyCode::Backspace => Self::typed_key(VK_BACK, '\u{8}', mods),
            KeyCode::Tab => Self::typed_key(VK_TAB, '\t', mods),
            KeyCode::BackTab => Self::typed_key(VK_TAB, '\t', mods | ModifierMask::SHIFT),
            KeyCode::Esc => Self::typed_key(VK_ESCAPE, '\u{1b}', mods),

            KeyCode::Up => Self::press(VK_UP, mods),
            KeyCode::Down => Self::press(VK_DOWN, mods),
            KeyCode::Left => Self::press(VK_LEFT, mods),
            KeyCode::Right => Self::press(VK_RIGHT, mods),
            KeyCode::Home => Self::press(VK_HOME, mods),
            KeyCode::End => Self::press(VK_END, mods),
            KeyCode::PageUp => Self::press(VK_PRIOR, mods),
            KeyCode::PageDown => Self::press(VK_NEXT, mods),
            KeyCode::Insert => Self::press(VK_INSERT, mods),
            KeyCode::Delete => Self::press(VK_DELETE, mods),

            KeyCode::F(n @ 1..=24) => Self::press(VK_F1 + n as u16 - 1, mods),

            _ => Vec::new(),
        }
    }

    /// Character with modifiers; Ctrl+letter types the matching control code
    fn map_char(ch: char, mods: ModifierMask) -> KeyInput {
        let ch = if mods.contains(ModifierMask::LEFT_CTRL) && ch.is_ascii_alphabetic() {
            char::from(ch.to_ascii_lowercase() as u8 - b'a' + 1)
        } else {
            ch
        };
        KeyInput {
            modifiers: mods,
            ..KeyInput::char(ch)
        }
    }

    /// Down and up transitions of a virtual key
    fn press(virtual_key: u16, mods: ModifierMask) -> Vec<KeyInput> {
        vec![
            KeyInput::key(true, virtual_key, mods),
            KeyInput::key(false, virtual_key, mods),
        ]
    }

    /// Virtual key down, the character it types, virtual key up
    fn typed_key(virtual_key: u16, ch: char, mods: ModifierMask) -> Vec<KeyInput> {
        vec![
            KeyInput::key(true, virtual_key, mods),
            KeyInput {
                modifiers: mods,
                ..KeyInput::char(ch)
            },
            KeyInput::key(false, virtual_key, mods),
        ]
    }

    /// Host shortcut that closes the mirror (Ctrl+Q)
    pub fn is_quit(event: &KeyEvent) -> bool {
        event.kind != KeyEventKind::Release
            && event.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(event.code, KeyCode::Char('q') | KeyCode::Char('Q'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key_event(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, mods)
    }

    #[test]
    fn test_char_keys() {
        let event = key_event(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), vec![KeyInput::char('a')]);

        // Ctrl+C types ETX with the control bit set
        let event = key_event(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let inputs = KeyMapper::map(&event);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].ch, Some('\u{3}'));
        assert_eq!(inputs[0].modifiers, ModifierMask::LEFT_CTRL);

        let event = key_event(KeyCode::Char('X'), KeyModifiers::SHIFT);
        assert_eq!(KeyMapper::map(&event)[0].ch, Some('X'));
        assert_eq!(KeyMapper::map(&event)[0].modifiers, ModifierMask::SHIFT);
    }

    #[test]
    fn test_enter_types_carriage_return() {
        let event = key_event(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(
            KeyMapper::map(&event),
            vec![
                KeyInput::key(true, VK_RETURN, ModifierMask::empty()),
                KeyInput::char('\r'),
                KeyInput::key(false, VK_RETURN, ModifierMask::empty()),
            ]
        );
    }

    #[test]
    fn test_navigation_keys() {
        let event = key_event(KeyCode::Up, KeyModifiers::ALT);
        assert_eq!(
            KeyMapper::map(&event),
            vec![
                KeyInput::key(true, VK_UP, ModifierMask::LEFT_ALT),
                KeyInput::key(false, VK_UP, ModifierMask::LEFT_ALT),
            ]
        );

        let event = key_event(KeyCode::PageDown, KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event)[0].virtual_key, VK_NEXT);
    }

    #[test]
    fn test_function_keys() {
        let event = key_event(KeyCode::F(1), KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event)[0].virtual_key, 0x70);

        let event = key_event(KeyCode::F(12), KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event)[0].virtual_key, 0x7B);

        let event = key_event(KeyCode::F(30), KeyModifiers::NONE);
        assert!(KeyMapper::map(&event).is_empty());
    }

    #[test]
    fn test_release_is_ignored() {
        let event = KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert!(KeyMapper::map(&event).is_empty());
        assert!(!KeyMapper::is_quit(&event));
    }

    #[test]
    fn test_quit_shortcut() {
        assert!(KeyMapper::is_quit(&key_event(KeyCode::Char('q'), KeyModifiers::CONTROL)));
        assert!(!KeyMapper::is_quit(&key_event(KeyCode::Char('q'), KeyModifiers::NONE)));
    }
}
