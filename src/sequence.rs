//! Key sequences: modifier sets, chords and comma-separated chord lists.

use crate::key::Key;
use anyhow::{bail, Context, Result};
use std::ops::{BitOr, Index};

/// Modifier keys that can be combined with a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// No modifier held.
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };
    pub const META: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };

    /// Whether no modifier is held.
    pub fn is_empty(&self) -> bool {
        *self == Modifiers::NONE
    }

    /// Apply a modifier name such as "Ctrl" or "Super" to this set.
    fn set_by_name(&mut self, name: &str) -> Result<()> {
        match name.trim().to_uppercase().as_str() {
            "SHIFT" => self.shift = true,
            "CTRL" | "CONTROL" => self.ctrl = true,
            "ALT" | "OPTION" => self.alt = true,
            "META" | "SUPER" | "WIN" | "CMD" | "COMMAND" => self.meta = true,
            _ => bail!("Unknown modifier: {}", name),
        }
        Ok(())
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers {
            shift: self.shift || rhs.shift,
            ctrl: self.ctrl || rhs.ctrl,
            alt: self.alt || rhs.alt,
            meta: self.meta || rhs.meta,
        }
    }
}

impl std::fmt::Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        if self.meta {
            parts.push("Meta");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// One key combination, e.g. `Ctrl+Shift+F12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl Chord {
    /// Create a chord with no modifiers.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    /// Create a chord with the given modifiers.
    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Separate the chord into its key and its modifier set.
    pub fn split(self) -> (Key, Modifiers) {
        (self.key, self.modifiers)
    }

    /// Parse a single chord like "Shift+F8" or "F10".
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key_str, modifier_names)) = parts.split_last() else {
            bail!("Empty chord");
        };
        if key_str.is_empty() {
            bail!("Missing key in chord: {:?}", s);
        }

        let mut modifiers = Modifiers::NONE;
        for name in modifier_names {
            modifiers.set_by_name(name)?;
        }
        let key = Key::parse(key_str)?;

        Ok(Chord { key, modifiers })
    }
}

impl BitOr<Modifiers> for Key {
    type Output = Chord;

    fn bitor(self, modifiers: Modifiers) -> Chord {
        Chord::with_modifiers(self, modifiers)
    }
}

impl BitOr<Modifiers> for Chord {
    type Output = Chord;

    fn bitor(self, modifiers: Modifiers) -> Chord {
        Chord::with_modifiers(self.key, self.modifiers | modifiers)
    }
}

impl std::fmt::Display for Chord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

/// An ordered list of up to [`KeySequence::MAX_CHORDS`] chords.
///
/// The empty sequence means "no shortcut".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeySequence {
    chords: Vec<Chord>,
}

impl KeySequence {
    pub const MAX_CHORDS: usize = 4;

    /// The empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence from chords, rejecting more than `MAX_CHORDS`.
    pub fn from_chords(chords: impl IntoIterator<Item = Chord>) -> Result<Self> {
        let chords: Vec<Chord> = chords.into_iter().collect();
        if chords.len() > Self::MAX_CHORDS {
            bail!(
                "Key sequence has {} chords, at most {} are supported",
                chords.len(),
                Self::MAX_CHORDS
            );
        }
        Ok(Self { chords })
    }

    /// Parse a sequence like "Ctrl+Alt+A, Ctrl+Alt+B". A blank string gives
    /// the empty sequence.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::new());
        }
        let chords = s
            .split(',')
            .enumerate()
            .map(|(idx, part)| {
                Chord::parse(part).with_context(|| format!("Invalid chord {} in {:?}", idx + 1, s))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_chords(chords)
    }

    /// Whether the sequence has no chords.
    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// Number of chords.
    pub fn len(&self) -> usize {
        self.chords.len()
    }

    /// The chord at `idx`.
    pub fn get(&self, idx: usize) -> Option<&Chord> {
        self.chords.get(idx)
    }

    /// The chord a global shortcut binds; the rest are ignored.
    pub fn first(&self) -> Option<Chord> {
        self.chords.first().copied()
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }
}

impl Index<usize> for KeySequence {
    type Output = Chord;

    fn index(&self, idx: usize) -> &Chord {
        &self.chords[idx]
    }
}

impl From<Chord> for KeySequence {
    fn from(chord: Chord) -> Self {
        Self {
            chords: vec![chord],
        }
    }
}

impl From<Key> for KeySequence {
    fn from(key: Key) -> Self {
        Chord::new(key).into()
    }
}

impl std::str::FromStr for KeySequence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        KeySequence::parse(s)
    }
}

impl std::fmt::Display for KeySequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.chords.iter().map(Chord::to_string).collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_key() {
        let chord = Chord::parse("F8").unwrap();
        assert_eq!(chord.key, Key::F8);
        assert!(chord.modifiers.is_empty());
    }

    #[test]
    fn test_parse_with_shift() {
        let chord = Chord::parse("Shift+F8").unwrap();
        assert_eq!(chord.key, Key::F8);
        assert_eq!(chord.modifiers, Modifiers::SHIFT);
    }

    #[test]
    fn test_parse_with_multiple_modifiers() {
        let (key, mods) = Chord::parse("Ctrl+Shift+F12").unwrap().split();
        assert_eq!(key, Key::F12);
        assert!(mods.ctrl);
        assert!(mods.shift);
        assert!(!mods.alt);
        assert!(!mods.meta);
    }

    #[test]
    fn test_parse_meta_aliases() {
        for name in ["Meta", "super", "Win", "Cmd"] {
            let chord = Chord::parse(&format!("{}+Space", name)).unwrap();
            assert_eq!(chord.modifiers, Modifiers::META);
        }
    }

    #[test]
    fn test_parse_case_insensitive() {
        let chord = Chord::parse("SHIFT+f8").unwrap();
        assert_eq!(chord.key, Key::F8);
        assert!(chord.modifiers.shift);
    }

    #[test]
    fn test_parse_unknown_modifier() {
        assert!(Chord::parse("Hyper+F8").is_err());
    }

    #[test]
    fn test_parse_missing_key() {
        assert!(Chord::parse("Ctrl+").is_err());
    }

    #[test]
    fn test_sequence_keeps_every_chord() {
        let seq = KeySequence::parse("Ctrl+Alt+A, Ctrl+Alt+B").unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0], Key::A | (Modifiers::CTRL | Modifiers::ALT));
        assert_eq!(seq[1].key, Key::B);
        assert_eq!(seq.first(), Some(seq[0]));
    }

    #[test]
    fn test_blank_sequence_is_empty() {
        let seq = KeySequence::parse("  ").unwrap();
        assert!(seq.is_empty());
        assert_eq!(seq.first(), None);
        assert_eq!(seq.to_string(), "");
    }

    #[test]
    fn test_too_many_chords() {
        assert!(KeySequence::parse("A, B, C, D, E").is_err());
        assert!(KeySequence::parse("A, B, C, D").is_ok());
    }

    #[test]
    fn test_empty_chord_in_list() {
        assert!(KeySequence::parse("Ctrl+A,,B").is_err());
    }

    #[test]
    fn test_compose_key_with_modifiers() {
        let chord = Key::F12 | Modifiers::CTRL | Modifiers::SHIFT;
        assert_eq!(chord, Chord::parse("Shift+Ctrl+F12").unwrap());
    }

    #[test]
    fn test_display() {
        let seq: KeySequence = "shift+ctrl+f12, meta+alt+x".parse().unwrap();
        assert_eq!(seq.to_string(), "Ctrl+Shift+F12, Alt+Meta+X");
    }
}
