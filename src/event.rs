//! Native events seen by the event filter.

/// A key and modifier pair in the platform's own encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeChord {
    pub key: u32,
    pub mods: u32,
}

impl NativeChord {
    /// Pair a native key code with a native modifier mask.
    pub fn new(key: u32, mods: u32) -> Self {
        Self { key, mods }
    }
}

impl std::fmt::Display for NativeChord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "key=0x{:x} mods=0x{:x}", self.key, self.mods)
    }
}

/// A native platform event, as handed to the installed event filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent {
    /// The OS reported that a registered global hotkey was triggered.
    Hotkey { key: u32, mods: u32 },
    /// Any other native message, identified by its platform message id.
    Message(u32),
}

impl NativeEvent {
    /// A hotkey trigger for `chord`.
    pub fn hotkey(chord: NativeChord) -> Self {
        NativeEvent::Hotkey {
            key: chord.key,
            mods: chord.mods,
        }
    }

    /// The triggered pair, if this event is a hotkey trigger.
    pub fn hotkey_chord(&self) -> Option<NativeChord> {
        match *self {
            NativeEvent::Hotkey { key, mods } => Some(NativeChord { key, mods }),
            NativeEvent::Message(_) => None,
        }
    }
}
