//! Platform-agnostic key representation.

use anyhow::{anyhow, Result};

/// Platform-agnostic key representation.
///
/// Modifier keys are not keys here; they live in [`Modifiers`](crate::Modifiers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Space,
    Tab,
    Return,
    Escape,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Left,
    Up,
    Right,
    Down,
    ScrollLock,
    Pause,
    PrintScreen,
}

impl Key {
    /// Every key, in declaration order.
    pub const ALL: [Key; 66] = [
        Key::A,
        Key::B,
        Key::C,
        Key::D,
        Key::E,
        Key::F,
        Key::G,
        Key::H,
        Key::I,
        Key::J,
        Key::K,
        Key::L,
        Key::M,
        Key::N,
        Key::O,
        Key::P,
        Key::Q,
        Key::R,
        Key::S,
        Key::T,
        Key::U,
        Key::V,
        Key::W,
        Key::X,
        Key::Y,
        Key::Z,
        Key::Num0,
        Key::Num1,
        Key::Num2,
        Key::Num3,
        Key::Num4,
        Key::Num5,
        Key::Num6,
        Key::Num7,
        Key::Num8,
        Key::Num9,
        Key::F1,
        Key::F2,
        Key::F3,
        Key::F4,
        Key::F5,
        Key::F6,
        Key::F7,
        Key::F8,
        Key::F9,
        Key::F10,
        Key::F11,
        Key::F12,
        Key::Space,
        Key::Tab,
        Key::Return,
        Key::Escape,
        Key::Backspace,
        Key::Delete,
        Key::Insert,
        Key::Home,
        Key::End,
        Key::PageUp,
        Key::PageDown,
        Key::Left,
        Key::Up,
        Key::Right,
        Key::Down,
        Key::ScrollLock,
        Key::Pause,
        Key::PrintScreen,
    ];

    /// Parse a key from a string like "F8", "a", "7" or "ScrollLock".
    pub fn parse(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        let alias = match upper.as_str() {
            "ENTER" => Some(Key::Return),
            "ESC" => Some(Key::Escape),
            "DEL" => Some(Key::Delete),
            "INS" => Some(Key::Insert),
            "PGUP" => Some(Key::PageUp),
            "PGDOWN" => Some(Key::PageDown),
            "SCROLL_LOCK" => Some(Key::ScrollLock),
            "PRINT" | "PRINTSCREEN" | "PRINT_SCREEN" | "PRTSC" | "SYSRQ" => Some(Key::PrintScreen),
            "BREAK" => Some(Key::Pause),
            "LEFTARROW" => Some(Key::Left),
            "RIGHTARROW" => Some(Key::Right),
            "UPARROW" => Some(Key::Up),
            "DOWNARROW" => Some(Key::Down),
            _ => None,
        };
        if let Some(key) = alias {
            return Ok(key);
        }
        Key::ALL
            .iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(&upper))
            .ok_or_else(|| anyhow!("Unknown key: {}", s))
    }

    /// Canonical name, as used by `Display`.
    pub fn name(self) -> &'static str {
        match self {
            Key::A => "A",
            Key::B => "B",
            Key::C => "C",
            Key::D => "D",
            Key::E => "E",
            Key::F => "F",
            Key::G => "G",
            Key::H => "H",
            Key::I => "I",
            Key::J => "J",
            Key::K => "K",
            Key::L => "L",
            Key::M => "M",
            Key::N => "N",
            Key::O => "O",
            Key::P => "P",
            Key::Q => "Q",
            Key::R => "R",
            Key::S => "S",
            Key::T => "T",
            Key::U => "U",
            Key::V => "V",
            Key::W => "W",
            Key::X => "X",
            Key::Y => "Y",
            Key::Z => "Z",
            Key::Num0 => "0",
            Key::Num1 => "1",
            Key::Num2 => "2",
            Key::Num3 => "3",
            Key::Num4 => "4",
            Key::Num5 => "5",
            Key::Num6 => "6",
            Key::Num7 => "7",
            Key::Num8 => "8",
            Key::Num9 => "9",
            Key::F1 => "F1",
            Key::F2 => "F2",
            Key::F3 => "F3",
            Key::F4 => "F4",
            Key::F5 => "F5",
            Key::F6 => "F6",
            Key::F7 => "F7",
            Key::F8 => "F8",
            Key::F9 => "F9",
            Key::F10 => "F10",
            Key::F11 => "F11",
            Key::F12 => "F12",
            Key::Space => "Space",
            Key::Tab => "Tab",
            Key::Return => "Return",
            Key::Escape => "Escape",
            Key::Backspace => "Backspace",
            Key::Delete => "Delete",
            Key::Insert => "Insert",
            Key::Home => "Home",
            Key::End => "End",
            Key::PageUp => "PageUp",
            Key::PageDown => "PageDown",
            Key::Left => "Left",
            Key::Up => "Up",
            Key::Right => "Right",
            Key::Down => "Down",
            Key::ScrollLock => "ScrollLock",
            Key::Pause => "Pause",
            Key::PrintScreen => "Print",
        }
    }

    /// Stable portable code for this key, starting at 1. Zero is never used
    /// so that it can mean "no key" in native tables.
    pub fn code(self) -> u32 {
        Key::ALL
            .iter()
            .position(|key| *key == self)
            .map(|idx| idx as u32 + 1)
            .unwrap_or(0)
    }

    /// Inverse of [`Key::code`].
    pub fn from_code(code: u32) -> Option<Self> {
        code.checked_sub(1)
            .and_then(|idx| Key::ALL.get(idx as usize))
            .copied()
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Key {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Key::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_function_keys() {
        assert_eq!(Key::parse("F8").unwrap(), Key::F8);
        assert_eq!(Key::parse("f12").unwrap(), Key::F12);
    }

    #[test]
    fn test_parse_letters_and_digits() {
        assert_eq!(Key::parse("a").unwrap(), Key::A);
        assert_eq!(Key::parse("Z").unwrap(), Key::Z);
        assert_eq!(Key::parse("7").unwrap(), Key::Num7);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Key::parse("Enter").unwrap(), Key::Return);
        assert_eq!(Key::parse("esc").unwrap(), Key::Escape);
        assert_eq!(Key::parse("scroll_lock").unwrap(), Key::ScrollLock);
        assert_eq!(Key::parse("PgDown").unwrap(), Key::PageDown);
        assert_eq!(Key::parse("PrintScreen").unwrap(), Key::PrintScreen);
    }

    #[test]
    fn test_parse_unknown_key() {
        assert!(Key::parse("F13").is_err());
        assert!(Key::parse("").is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for key in Key::ALL {
            assert_eq!(Key::parse(&key.to_string()).unwrap(), key);
        }
    }

    #[test]
    fn test_codes_are_nonzero_and_invertible() {
        for key in Key::ALL {
            assert_ne!(key.code(), 0);
            assert_eq!(Key::from_code(key.code()), Some(key));
        }
        assert_eq!(Key::from_code(0), None);
        assert_eq!(Key::from_code(1000), None);
    }
}
