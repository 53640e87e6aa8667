//! In-memory backend for hosts without a native hotkey API, and for tests.
//!
//! Keys use [`Key::code`] and modifiers use a Shift/Ctrl/Alt/Meta mask of
//! 1/2/4/8. Clones share state, so a caller can keep a handle after giving
//! the backend to the registry.

use crate::backend::NativeBackend;
use crate::event::{NativeChord, NativeEvent};
use crate::key::Key;
use crate::sequence::Modifiers;
use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

pub const MOD_SHIFT: u32 = 1;
pub const MOD_CTRL: u32 = 2;
pub const MOD_ALT: u32 = 4;
pub const MOD_META: u32 = 8;

#[derive(Debug, Default)]
struct State {
    registered: BTreeSet<NativeChord>,
    /// Pairs held by "another process".
    foreign: BTreeSet<NativeChord>,
    fail_unregister: bool,
    queue: VecDeque<NativeEvent>,
    register_calls: usize,
    unregister_calls: usize,
}

/// Headless native backend.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    state: Rc<RefCell<State>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend another process owns `chord`, so registering it fails.
    pub fn claim_foreign(&self, chord: NativeChord) {
        self.state.borrow_mut().foreign.insert(chord);
    }

    /// Make every later unregistration fail (or succeed again).
    pub fn set_fail_unregister(&self, fail: bool) {
        self.state.borrow_mut().fail_unregister = fail;
    }

    /// Pairs currently registered with this backend.
    pub fn registered(&self) -> Vec<NativeChord> {
        self.state.borrow().registered.iter().copied().collect()
    }

    /// Whether `chord` is currently registered.
    pub fn is_registered(&self, chord: NativeChord) -> bool {
        self.state.borrow().registered.contains(&chord)
    }

    /// Number of registration attempts, successful or not.
    pub fn register_calls(&self) -> usize {
        self.state.borrow().register_calls
    }

    /// Number of unregistration attempts, successful or not.
    pub fn unregister_calls(&self) -> usize {
        self.state.borrow().unregister_calls
    }

    /// Queue a native event for the next [`crate::process_native_events`].
    pub fn inject(&self, event: NativeEvent) {
        self.state.borrow_mut().queue.push_back(event);
    }

    /// Queue a hotkey trigger for `key` with `mods`.
    pub fn press(&self, key: Key, mods: Modifiers) {
        let chord = self.native_chord(key, mods);
        self.inject(NativeEvent::hotkey(chord));
    }
}

impl NativeBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn native_keycode(&self, key: Key) -> u32 {
        key.code()
    }

    fn native_modifiers(&self, mods: Modifiers) -> u32 {
        let mut native = 0;
        if mods.shift {
            native |= MOD_SHIFT;
        }
        if mods.ctrl {
            native |= MOD_CTRL;
        }
        if mods.alt {
            native |= MOD_ALT;
        }
        if mods.meta {
            native |= MOD_META;
        }
        native
    }

    fn register_shortcut(&mut self, key: u32, mods: u32) -> Result<()> {
        let chord = NativeChord::new(key, mods);
        let mut state = self.state.borrow_mut();
        state.register_calls += 1;
        if key == 0 {
            bail!("no native key code");
        }
        if state.foreign.contains(&chord) {
            bail!("{} is grabbed by another application", chord);
        }
        if !state.registered.insert(chord) {
            bail!("{} is already registered", chord);
        }
        Ok(())
    }

    fn unregister_shortcut(&mut self, key: u32, mods: u32) -> Result<()> {
        let chord = NativeChord::new(key, mods);
        let mut state = self.state.borrow_mut();
        state.unregister_calls += 1;
        if state.fail_unregister {
            bail!("unregistering {} was refused", chord);
        }
        if !state.registered.remove(&chord) {
            bail!("{} is not registered", chord);
        }
        Ok(())
    }

    fn take_events(&mut self) -> Vec<NativeEvent> {
        self.state.borrow_mut().queue.drain(..).collect()
    }
}
