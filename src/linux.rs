//! Linux backend using evdev.
//!
//! Native key codes are evdev codes and native modifiers use the X11 masks.
//! Registering a chord adds it to a grab table watched by a reader thread
//! over `/dev/input`; matching presses are queued as native hotkey events
//! for [`process_native_events`](crate::process_native_events).
//!
//! Reading evdev does not stop other applications from seeing the keys.
//! The user must be allowed to read `/dev/input/event*`, which usually means
//! being in the `input` group.

use crate::backend::NativeBackend;
use crate::event::{NativeChord, NativeEvent};
use crate::key::Key;
use crate::sequence::Modifiers;
use anyhow::{anyhow, bail, Context, Result};
use evdev::Device;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use std::collections::HashSet;
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const SHIFT_MASK: u32 = 1 << 0;
pub const CONTROL_MASK: u32 = 1 << 2;
pub const MOD1_MASK: u32 = 1 << 3;
pub const MOD4_MASK: u32 = 1 << 6;

type GrabTable = Arc<Mutex<HashSet<NativeChord>>>;

/// Convert our platform-agnostic Key to evdev Key.
fn to_evdev_key(key: Key) -> evdev::Key {
    match key {
        Key::A => evdev::Key::KEY_A,
        Key::B => evdev::Key::KEY_B,
        Key::C => evdev::Key::KEY_C,
        Key::D => evdev::Key::KEY_D,
        Key::E => evdev::Key::KEY_E,
        Key::F => evdev::Key::KEY_F,
        Key::G => evdev::Key::KEY_G,
        Key::H => evdev::Key::KEY_H,
        Key::I => evdev::Key::KEY_I,
        Key::J => evdev::Key::KEY_J,
        Key::K => evdev::Key::KEY_K,
        Key::L => evdev::Key::KEY_L,
        Key::M => evdev::Key::KEY_M,
        Key::N => evdev::Key::KEY_N,
        Key::O => evdev::Key::KEY_O,
        Key::P => evdev::Key::KEY_P,
        Key::Q => evdev::Key::KEY_Q,
        Key::R => evdev::Key::KEY_R,
        Key::S => evdev::Key::KEY_S,
        Key::T => evdev::Key::KEY_T,
        Key::U => evdev::Key::KEY_U,
        Key::V => evdev::Key::KEY_V,
        Key::W => evdev::Key::KEY_W,
        Key::X => evdev::Key::KEY_X,
        Key::Y => evdev::Key::KEY_Y,
        Key::Z => evdev::Key::KEY_Z,
        Key::Num0 => evdev::Key::KEY_0,
        Key::Num1 => evdev::Key::KEY_1,
        Key::Num2 => evdev::Key::KEY_2,
        Key::Num3 => evdev::Key::KEY_3,
        Key::Num4 => evdev::Key::KEY_4,
        Key::Num5 => evdev::Key::KEY_5,
        Key::Num6 => evdev::Key::KEY_6,
        Key::Num7 => evdev::Key::KEY_7,
        Key::Num8 => evdev::Key::KEY_8,
        Key::Num9 => evdev::Key::KEY_9,
        Key::F1 => evdev::Key::KEY_F1,
        Key::F2 => evdev::Key::KEY_F2,
        Key::F3 => evdev::Key::KEY_F3,
        Key::F4 => evdev::Key::KEY_F4,
        Key::F5 => evdev::Key::KEY_F5,
        Key::F6 => evdev::Key::KEY_F6,
        Key::F7 => evdev::Key::KEY_F7,
        Key::F8 => evdev::Key::KEY_F8,
        Key::F9 => evdev::Key::KEY_F9,
        Key::F10 => evdev::Key::KEY_F10,
        Key::F11 => evdev::Key::KEY_F11,
        Key::F12 => evdev::Key::KEY_F12,
        Key::Space => evdev::Key::KEY_SPACE,
        Key::Tab => evdev::Key::KEY_TAB,
        Key::Return => evdev::Key::KEY_ENTER,
        Key::Escape => evdev::Key::KEY_ESC,
        Key::Backspace => evdev::Key::KEY_BACKSPACE,
        Key::Delete => evdev::Key::KEY_DELETE,
        Key::Insert => evdev::Key::KEY_INSERT,
        Key::Home => evdev::Key::KEY_HOME,
        Key::End => evdev::Key::KEY_END,
        Key::PageUp => evdev::Key::KEY_PAGEUP,
        Key::PageDown => evdev::Key::KEY_PAGEDOWN,
        Key::Left => evdev::Key::KEY_LEFT,
        Key::Up => evdev::Key::KEY_UP,
        Key::Right => evdev::Key::KEY_RIGHT,
        Key::Down => evdev::Key::KEY_DOWN,
        Key::ScrollLock => evdev::Key::KEY_SCROLLLOCK,
        Key::Pause => evdev::Key::KEY_PAUSE,
        Key::PrintScreen => evdev::Key::KEY_SYSRQ,
    }
}

/// X11 modifier mask for `mods`.
fn x11_modifiers(mods: Modifiers) -> u32 {
    let mut native = 0;
    if mods.shift {
        native |= SHIFT_MASK;
    }
    if mods.ctrl {
        native |= CONTROL_MASK;
    }
    if mods.alt {
        native |= MOD1_MASK;
    }
    if mods.meta {
        native |= MOD4_MASK;
    }
    native
}

/// Find all keyboard devices in /dev/input.
pub fn find_keyboards() -> Result<Vec<Device>> {
    let mut keyboards = Vec::new();

    for entry in std::fs::read_dir("/dev/input")? {
        let entry = entry?;
        let path = entry.path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        if let Ok(device) = Device::open(&path) {
            if device
                .supported_keys()
                .map(|keys| keys.contains(evdev::Key::KEY_A))
                .unwrap_or(false)
            {
                log::debug!("Found keyboard: {:?} at {:?}", device.name(), path);
                keyboards.push(device);
            }
        }
    }

    if keyboards.is_empty() {
        Err(anyhow!(
            "No keyboards found. Make sure you're in the 'input' group or running as root."
        ))
    } else {
        Ok(keyboards)
    }
}

/// Set non-blocking mode on keyboard devices.
fn set_nonblocking(keyboards: &[Device]) -> Result<()> {
    for device in keyboards {
        let fd = device.as_raw_fd();
        let flags = fcntl(fd, FcntlArg::F_GETFL).context("Failed to get fd flags")?;
        let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
        fcntl(fd, FcntlArg::F_SETFL(flags)).context("Failed to set non-blocking")?;
    }
    Ok(())
}

fn would_block(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(libc::EAGAIN) || e.raw_os_error() == Some(libc::EWOULDBLOCK)
}

/// Drain stale events so a reconnected keyboard starts from a clean state.
fn drain_events(keyboards: &mut [Device]) {
    for device in keyboards.iter_mut() {
        let device_name = device.name().map(String::from);
        loop {
            match device.fetch_events() {
                Ok(events) => {
                    let count = events.count();
                    if count == 0 {
                        break;
                    }
                    log::debug!("Drained {} stale events from {:?}", count, device_name);
                }
                Err(e) => {
                    if !would_block(&e) {
                        log::debug!("Error draining events from {:?}: {}", device_name, e);
                    }
                    break;
                }
            }
        }
    }
}

/// Held-modifier tracking across all keyboards.
#[derive(Debug, Default)]
struct ModifierState(Modifiers);

impl ModifierState {
    /// Update from a key event. Returns `true` if `key` is a modifier.
    fn update(&mut self, key: evdev::Key, value: i32) -> bool {
        let held = value != 0;
        let slot = match key {
            evdev::Key::KEY_LEFTSHIFT | evdev::Key::KEY_RIGHTSHIFT => &mut self.0.shift,
            evdev::Key::KEY_LEFTCTRL | evdev::Key::KEY_RIGHTCTRL => &mut self.0.ctrl,
            evdev::Key::KEY_LEFTALT | evdev::Key::KEY_RIGHTALT => &mut self.0.alt,
            evdev::Key::KEY_LEFTMETA | evdev::Key::KEY_RIGHTMETA => &mut self.0.meta,
            _ => return false,
        };
        *slot = held;
        true
    }
}

/// Linux global shortcut backend.
pub struct LinuxBackend {
    grabs: GrabTable,
    running: Arc<AtomicBool>,
    rx: Option<Receiver<NativeEvent>>,
}

impl LinuxBackend {
    /// Create a backend. The reader thread starts with the first grab.
    pub fn new() -> Self {
        Self {
            grabs: Arc::new(Mutex::new(HashSet::new())),
            running: Arc::new(AtomicBool::new(false)),
            rx: None,
        }
    }

    /// Start the reader thread on first use.
    fn ensure_listening(&mut self) -> Result<()> {
        if self.rx.is_some() {
            return Ok(());
        }
        let keyboards = find_keyboards()?;
        set_nonblocking(&keyboards)?;
        let (tx, rx) = mpsc::channel();
        self.running.store(true, Ordering::SeqCst);
        start_keyboard_listener(
            keyboards,
            Arc::clone(&self.grabs),
            Arc::clone(&self.running),
            tx,
        );
        self.rx = Some(rx);
        Ok(())
    }
}

impl Default for LinuxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeBackend for LinuxBackend {
    fn name(&self) -> &'static str {
        "evdev"
    }

    fn native_keycode(&self, key: Key) -> u32 {
        u32::from(to_evdev_key(key).code())
    }

    fn native_modifiers(&self, mods: Modifiers) -> u32 {
        x11_modifiers(mods)
    }

    fn register_shortcut(&mut self, key: u32, mods: u32) -> Result<()> {
        if key == 0 {
            bail!("no evdev key code");
        }
        self.ensure_listening()?;
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

impl Drop for LinuxBackend {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn start_keyboard_listener(
    keyboards: Vec<Device>,
    grabs: GrabTable,
    running: Arc<AtomicBool>,
    tx: Sender<NativeEvent>,
) {
    thread::spawn(move || {
        let mut keyboards = keyboards;
        let mut mods = ModifierState::default();
        let mut last_rescan = Instant::now();
        let mut had_error = false;

        const RESCAN_INTERVAL: Duration = Duration::from_secs(3);

        while running.load(Ordering::Relaxed) {
            if had_error && last_rescan.elapsed() >= RESCAN_INTERVAL {
                log::info!("Keyboard error detected, rescanning devices...");
                match find_keyboards() {
                    Ok(mut new_keyboards) => {
                        // Bluetooth keyboards need a moment after reconnecting.
                        thread::sleep(Duration::from_millis(100));

                        match set_nonblocking(&new_keyboards) {
                            Ok(()) => {
                                log::info!(
                                    "Keyboards reconnected: found {} device(s)",
                                    new_keyboards.len()
                                );
                                drain_events(&mut new_keyboards);
                                keyboards = new_keyboards;
                                mods = ModifierState::default();
                                had_error = false;
                            }
                            Err(e) => {
                                log::warn!("Failed to set non-blocking on new keyboards: {}", e);
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to rescan keyboards: {}", e);
                    }
                }
                last_rescan = Instant::now();
            }

            for device in keyboards.iter_mut() {
                let events = match device.fetch_events() {
                    Ok(events) => events,
                    Err(e) => {
                        if !would_block(&e) {
                            log::debug!("Keyboard read error: {}", e);
                            had_error = true;
                        }
                        continue;
                    }
                };

                for event in events {
                    let evdev::InputEventKind::Key(key) = event.kind() else {
                        continue;
                    };
                    if mods.update(key, event.value()) || event.value() != 1 {
                        continue;
                    }

                    let chord = NativeChord::new(u32::from(key.code()), x11_modifiers(mods.0));
                    let grabbed = grabs
                        .lock()
                        .map(|grabs| grabs.contains(&chord))
                        .unwrap_or(false);
                    if grabbed && tx.send(NativeEvent::hotkey(chord)).is_err() {
                        log::debug!("Shortcut backend gone, stopping keyboard listener");
                        return;
                    }
                }
            }

            thread::sleep(Duration::from_millis(10));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keycodes_match_evdev() {
        let backend = LinuxBackend::new();
        assert_eq!(backend.native_keycode(Key::A), 30);
        assert_eq!(backend.native_keycode(Key::F12), 88);
        assert_eq!(backend.native_keycode(Key::Return), 28);
        for key in Key::ALL {
            assert_ne!(backend.native_keycode(key), 0, "{} has no evdev code", key);
        }
    }

    #[test]
    fn test_modifiers_use_x11_masks() {
        let backend = LinuxBackend::new();
        assert_eq!(
            backend.native_modifiers(Modifiers::CTRL | Modifiers::SHIFT),
            CONTROL_MASK | SHIFT_MASK
        );
        assert_eq!(backend.native_modifiers(Modifiers::ALT), MOD1_MASK);
        assert_eq!(backend.native_modifiers(Modifiers::META), MOD4_MASK);
    }

    #[test]
    fn test_modifier_tracking() {
        let mut state = ModifierState::default();
        assert!(state.update(evdev::Key::KEY_LEFTCTRL, 1));
        assert!(state.update(evdev::Key::KEY_RIGHTSHIFT, 1));
        assert_eq!(state.0, Modifiers::CTRL | Modifiers::SHIFT);
        // Autorepeat keeps the modifier held.
        assert!(state.update(evdev::Key::KEY_LEFTCTRL, 2));
        assert!(state.0.ctrl);
        assert!(state.update(evdev::Key::KEY_LEFTCTRL, 0));
        assert_eq!(state.0, Modifiers::SHIFT);
        assert!(!state.update(evdev::Key::KEY_F12, 1));
    }

    #[test]
    fn test_unregister_without_grab_fails() {
        let mut backend = LinuxBackend::new();
        assert!(backend.unregister_shortcut(30, 0).is_err());
        assert!(backend.take_events().is_empty());
    }
}
