//! macOS backend using rdev.
//!
//! Native key codes are Carbon virtual key codes (`kVK_*`) and native
//! modifiers are the Carbon event modifier masks. A single `rdev::listen`
//! thread watches the keyboard and queues presses of grabbed chords.
//!
//! The process needs the Accessibility permission for rdev to see input.

use crate::backend::NativeBackend;
use crate::event::{NativeChord, NativeEvent};
use crate::key::Key;
use crate::sequence::Modifiers;
use anyhow::{anyhow, bail, Result};
use rdev::{listen, Event, EventType};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

pub const CMD_KEY: u32 = 1 << 8;
pub const SHIFT_KEY: u32 = 1 << 9;
pub const OPTION_KEY: u32 = 1 << 11;
pub const CONTROL_KEY: u32 = 1 << 12;

type GrabTable = Arc<Mutex<HashSet<NativeChord>>>;

/// Carbon virtual key code for `key`.
fn carbon_keycode(key: Key) -> u32 {
    match key {
        Key::A => 0x00,
        Key::S => 0x01,
        Key::D => 0x02,
        Key::F => 0x03,
        Key::H => 0x04,
        Key::G => 0x05,
        Key::Z => 0x06,
        Key::X => 0x07,
        Key::C => 0x08,
        Key::V => 0x09,
        Key::B => 0x0B,
        Key::Q => 0x0C,
        Key::W => 0x0D,
        Key::E => 0x0E,
        Key::R => 0x0F,
        Key::Y => 0x10,
        Key::T => 0x11,
        Key::Num1 => 0x12,
        Key::Num2 => 0x13,
        Key::Num3 => 0x14,
        Key::Num4 => 0x15,
        Key::Num6 => 0x16,
        Key::Num5 => 0x17,
        Key::Num9 => 0x19,
        Key::Num7 => 0x1A,
        Key::Num8 => 0x1C,
        Key::Num0 => 0x1D,
        Key::O => 0x1F,
        Key::U => 0x20,
        Key::I => 0x22,
        Key::P => 0x23,
        Key::Return => 0x24,
        Key::L => 0x25,
        Key::J => 0x26,
        Key::K => 0x28,
        Key::N => 0x2D,
        Key::M => 0x2E,
        Key::Tab => 0x30,
        Key::Space => 0x31,
        Key::Backspace => 0x33,
        Key::Escape => 0x35,
        Key::F5 => 0x60,
        Key::F6 => 0x61,
        Key::F7 => 0x62,
        Key::F3 => 0x63,
        Key::F8 => 0x64,
        Key::F9 => 0x65,
        Key::F11 => 0x67,
        // F13..F15 sit where PC keyboards have PrintScreen, ScrollLock, Pause.
        Key::PrintScreen => 0x69,
        Key::ScrollLock => 0x6B,
        Key::F10 => 0x6D,
        Key::F12 => 0x6F,
        Key::Pause => 0x71,
        Key::Insert => 0x72,
        Key::Home => 0x73,
        Key::PageUp => 0x74,
        Key::Delete => 0x75,
        Key::F4 => 0x76,
        Key::End => 0x77,
        Key::F2 => 0x78,
        Key::PageDown => 0x79,
        Key::F1 => 0x7A,
        Key::Left => 0x7B,
        Key::Right => 0x7C,
        Key::Down => 0x7D,
        Key::Up => 0x7E,
    }
}

/// Carbon modifier mask for `mods`.
fn carbon_modifiers(mods: Modifiers) -> u32 {
    let mut native = 0;
    if mods.meta {
        native |= CMD_KEY;
    }
    if mods.shift {
        native |= SHIFT_KEY;
    }
    if mods.alt {
        native |= OPTION_KEY;
    }
    if mods.ctrl {
        native |= CONTROL_KEY;
    }
    native
}

/// Convert an rdev key to our platform-agnostic Key.
fn from_rdev_key(key: rdev::Key) -> Option<Key> {
    let key = match key {
        rdev::Key::KeyA => Key::A,
        rdev::Key::KeyB => Key::B,
        rdev::Key::KeyC => Key::C,
        rdev::Key::KeyD => Key::D,
        rdev::Key::KeyE => Key::E,
        rdev::Key::KeyF => Key::F,
        rdev::Key::KeyG => Key::G,
        rdev::Key::KeyH => Key::H,
        rdev::Key::KeyI => Key::I,
        rdev::Key::KeyJ => Key::J,
        rdev::Key::KeyK => Key::K,
        rdev::Key::KeyL => Key::L,
        rdev::Key::KeyM => Key::M,
        rdev::Key::KeyN => Key::N,
        rdev::Key::KeyO => Key::O,
        rdev::Key::KeyP => Key::P,
        rdev::Key::KeyQ => Key::Q,
        rdev::Key::KeyR => Key::R,
        rdev::Key::KeyS => Key::S,
        rdev::Key::KeyT => Key::T,
        rdev::Key::KeyU => Key::U,
        rdev::Key::KeyV => Key::V,
        rdev::Key::KeyW => Key::W,
        rdev::Key::KeyX => Key::X,
        rdev::Key::KeyY => Key::Y,
        rdev::Key::KeyZ => Key::Z,
        rdev::Key::Num0 => Key::Num0,
        rdev::Key::Num1 => Key::Num1,
        rdev::Key::Num2 => Key::Num2,
        rdev::Key::Num3 => Key::Num3,
        rdev::Key::Num4 => Key::Num4,
        rdev::Key::Num5 => Key::Num5,
        rdev::Key::Num6 => Key::Num6,
        rdev::Key::Num7 => Key::Num7,
        rdev::Key::Num8 => Key::Num8,
        rdev::Key::Num9 => Key::Num9,
        rdev::Key::F1 => Key::F1,
        rdev::Key::F2 => Key::F2,
        rdev::Key::F3 => Key::F3,
        rdev::Key::F4 => Key::F4,
        rdev::Key::F5 => Key::F5,
        rdev::Key::F6 => Key::F6,
        rdev::Key::F7 => Key::F7,
        rdev::Key::F8 => Key::F8,
        rdev::Key::F9 => Key::F9,
        rdev::Key::F10 => Key::F10,
        rdev::Key::F11 => Key::F11,
        rdev::Key::F12 => Key::F12,
        rdev::Key::Space => Key::Space,
        rdev::Key::Tab => Key::Tab,
        rdev::Key::Return => Key::Return,
        rdev::Key::Escape => Key::Escape,
        rdev::Key::Backspace => Key::Backspace,
        rdev::Key::Delete => Key::Delete,
        rdev::Key::Insert => Key::Insert,
        rdev::Key::Home => Key::Home,
        rdev::Key::End => Key::End,
        rdev::Key::PageUp => Key::PageUp,
        rdev::Key::PageDown => Key::PageDown,
        rdev::Key::LeftArrow => Key::Left,
        rdev::Key::UpArrow => Key::Up,
        rdev::Key::RightArrow => Key::Right,
        rdev::Key::DownArrow => Key::Down,
        rdev::Key::ScrollLock => Key::ScrollLock,
        rdev::Key::Pause => Key::Pause,
        rdev::Key::PrintScreen => Key::PrintScreen,
        _ => return None,
    };
    Some(key)
}

/// Update held modifiers. Returns `true` if `key` is a modifier.
fn track_modifier(mods: &mut Modifiers, key: rdev::Key, held: bool) -> bool {
    let slot = match key {
        rdev::Key::ShiftLeft | rdev::Key::ShiftRight => &mut mods.shift,
        rdev::Key::ControlLeft | rdev::Key::ControlRight => &mut mods.ctrl,
        rdev::Key::Alt | rdev::Key::AltGr => &mut mods.alt,
        rdev::Key::MetaLeft | rdev::Key::MetaRight => &mut mods.meta,
        _ => return false,
    };
    *slot = held;
    true
}

/// macOS global shortcut backend.
pub struct MacosBackend {
    grabs: GrabTable,
    running: Arc<AtomicBool>,
    rx: Option<Receiver<NativeEvent>>,
}

impl MacosBackend {
    /// Create a backend. The listener starts with the first grab.
    pub fn new() -> Self {
        Self {
            grabs: Arc::new(Mutex::new(HashSet::new())),
            running: Arc::new(AtomicBool::new(false)),
            rx: None,
        }
    }

    fn ensure_listening(&mut self) {
        if self.rx.is_some() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        self.running.store(true, Ordering::SeqCst);
        start_keyboard_listener(Arc::clone(&self.grabs), Arc::clone(&self.running), tx);
        self.rx = Some(rx);
    }
}

impl Default for MacosBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeBackend for MacosBackend {
    fn name(&self) -> &'static str {
        "rdev"
    }

    fn native_keycode(&self, key: Key) -> u32 {
        carbon_keycode(key)
    }

    fn native_modifiers(&self, mods: Modifiers) -> u32 {
        carbon_modifiers(mods)
    }

    // kVK_ANSI_A is 0, so unlike other backends a zero key code is valid here.
    fn register_shortcut(&mut self, key: u32, mods: u32) -> Result<()> {
        self.ensure_listening();
        let chord = NativeChord::new(key, mods);
        let mut grabs = self
            .grabs
            .lock()
            .map_err(|_| anyhow!("grab table poisoned"))?;
        if !grabs.insert(chord) {
            bail!("{} is already grabbed", chord);
        }
        Ok(())
    }

    fn unregister_shortcut(&mut self, key: u32, mods: u32) -> Result<()> {
        let chord = NativeChord::new(key, mods);
        let mut grabs = self
            .grabs
            .lock()
            .map_err(|_| anyhow!("grab table poisoned"))?;
        if !grabs.remove(&chord) {
            bail!("{} is not grabbed", chord);
        }
        Ok(())
    }

    fn take_events(&mut self) -> Vec<NativeEvent> {
        match &self.rx {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        }
    }
}

impl Drop for MacosBackend {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn start_keyboard_listener(grabs: GrabTable, running: Arc<AtomicBool>, tx: Sender<NativeEvent>) {
    let stop = Arc::clone(&running);
    thread::spawn(move || {
        let mut mods = Modifiers::NONE;

        let callback = move |event: Event| {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            match event.event_type {
                EventType::KeyPress(key) => {
                    if track_modifier(&mut mods, key, true) {
                        return;
                    }
                    let Some(key) = from_rdev_key(key) else {
                        return;
                    };
                    let chord = NativeChord::new(carbon_keycode(key), carbon_modifiers(mods));
                    let grabbed = grabs
                        .lock()
                        .map(|grabs| grabs.contains(&chord))
                        .unwrap_or(false);
                    if grabbed {
                        let _ = tx.send(NativeEvent::hotkey(chord));
                    }
                }
                EventType::KeyRelease(key) => {
                    track_modifier(&mut mods, key, false);
                }
                _ => {}
            }
        };

        if let Err(e) = listen(callback) {
            log::error!("Error listening to keyboard events: {:?}", e);
            stop.store(false, Ordering::SeqCst);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carbon_codes_are_distinct() {
        let codes: HashSet<u32> = Key::ALL.iter().map(|key| carbon_keycode(*key)).collect();
        assert_eq!(codes.len(), Key::ALL.len());
    }

    #[test]
    fn test_carbon_modifiers() {
        assert_eq!(
            carbon_modifiers(Modifiers::CTRL | Modifiers::SHIFT),
            CONTROL_KEY | SHIFT_KEY
        );
        assert_eq!(carbon_modifiers(Modifiers::META), CMD_KEY);
    }

    #[test]
    fn test_rdev_round_trip() {
        assert_eq!(from_rdev_key(rdev::Key::F12), Some(Key::F12));
        assert_eq!(from_rdev_key(rdev::Key::ShiftLeft), None);
    }

    #[test]
    fn test_track_modifier() {
        let mut mods = Modifiers::NONE;
        assert!(track_modifier(&mut mods, rdev::Key::MetaLeft, true));
        assert_eq!(mods, Modifiers::META);
        assert!(track_modifier(&mut mods, rdev::Key::MetaLeft, false));
        assert!(!track_modifier(&mut mods, rdev::Key::KeyA, true));
        assert!(mods.is_empty());
    }
}
