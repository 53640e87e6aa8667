//! Windows backend using `RegisterHotKey`.
//!
//! Hotkeys are registered for the calling thread (null window), so Windows
//! posts `WM_HOTKEY` to the thread's message queue. The host's message loop
//! passes each message through [`filter_message`].

use crate::backend::NativeBackend;
use crate::dispatcher::EventDispatcher;
use crate::event::{NativeChord, NativeEvent};
use crate::key::Key;
use crate::sequence::Modifiers;
use anyhow::{anyhow, bail, Result};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::*;
use windows::Win32::UI::WindowsAndMessaging::{MSG, WM_HOTKEY};

/// Win32 virtual-key code for `key`.
fn virtual_key(key: Key) -> VIRTUAL_KEY {
    match key {
        Key::A => VK_A,
        Key::B => VK_B,
        Key::C => VK_C,
        Key::D => VK_D,
        Key::E => VK_E,
        Key::F => VK_F,
        Key::G => VK_G,
        Key::H => VK_H,
        Key::I => VK_I,
        Key::J => VK_J,
        Key::K => VK_K,
        Key::L => VK_L,
        Key::M => VK_M,
        Key::N => VK_N,
        Key::O => VK_O,
        Key::P => VK_P,
        Key::Q => VK_Q,
        Key::R => VK_R,
        Key::S => VK_S,
        Key::T => VK_T,
        Key::U => VK_U,
        Key::V => VK_V,
        Key::W => VK_W,
        Key::X => VK_X,
        Key::Y => VK_Y,
        Key::Z => VK_Z,
        Key::Num0 => VK_0,
        Key::Num1 => VK_1,
        Key::Num2 => VK_2,
        Key::Num3 => VK_3,
        Key::Num4 => VK_4,
        Key::Num5 => VK_5,
        Key::Num6 => VK_6,
        Key::Num7 => VK_7,
        Key::Num8 => VK_8,
        Key::Num9 => VK_9,
        Key::F1 => VK_F1,
        Key::F2 => VK_F2,
        Key::F3 => VK_F3,
        Key::F4 => VK_F4,
        Key::F5 => VK_F5,
        Key::F6 => VK_F6,
        Key::F7 => VK_F7,
        Key::F8 => VK_F8,
        Key::F9 => VK_F9,
        Key::F10 => VK_F10,
        Key::F11 => VK_F11,
        Key::F12 => VK_F12,
        Key::Space => VK_SPACE,
        Key::Tab => VK_TAB,
        Key::Return => VK_RETURN,
        Key::Escape => VK_ESCAPE,
        Key::Backspace => VK_BACK,
        Key::Delete => VK_DELETE,
        Key::Insert => VK_INSERT,
        Key::Home => VK_HOME,
        Key::End => VK_END,
        Key::PageUp => VK_PRIOR,
        Key::PageDown => VK_NEXT,
        Key::Left => VK_LEFT,
        Key::Up => VK_UP,
        Key::Right => VK_RIGHT,
        Key::Down => VK_DOWN,
        Key::ScrollLock => VK_SCROLL,
        Key::Pause => VK_PAUSE,
        Key::PrintScreen => VK_SNAPSHOT,
    }
}

/// The id `RegisterHotKey` is given for a pair.
///
/// Virtual keys fit in a byte and only the low four modifier bits are
/// registered, so distinct pairs get distinct ids below 0xC000.
fn hotkey_id(key: u32, mods: u32) -> i32 {
    (((mods & 0xF) << 8) | (key & 0xFF)) as i32
}

/// Decode a Win32 message into a native event.
///
/// For `WM_HOTKEY`, the high word of `lParam` is the virtual key and the low
/// word the modifiers.
pub fn native_event(msg: &MSG) -> NativeEvent {
    if msg.message == WM_HOTKEY {
        let lparam = msg.lParam.0 as usize;
        NativeEvent::Hotkey {
            key: ((lparam >> 16) & 0xFFFF) as u32,
            mods: (lparam & 0xFFFF) as u32,
        }
    } else {
        NativeEvent::Message(msg.message)
    }
}

/// Run `msg` through the thread's event filter. Returns `true` if consumed.
pub fn filter_message(msg: &MSG) -> bool {
    EventDispatcher::filter_native_event(&native_event(msg))
}

/// Windows global shortcut backend.
#[derive(Debug, Default)]
pub struct WindowsBackend;

impl WindowsBackend {
    /// Create a backend.
    pub fn new() -> Self {
        Self
    }
}

impl NativeBackend for WindowsBackend {
    fn name(&self) -> &'static str {
        "win32"
    }

    fn native_keycode(&self, key: Key) -> u32 {
        u32::from(virtual_key(key).0)
    }

    fn native_modifiers(&self, mods: Modifiers) -> u32 {
        let mut native = HOT_KEY_MODIFIERS(0);
        if mods.shift {
            native |= MOD_SHIFT;
        }
        if mods.ctrl {
            native |= MOD_CONTROL;
        }
        if mods.alt {
            native |= MOD_ALT;
        }
        if mods.meta {
            native |= MOD_WIN;
        }
        native.0
    }

    fn register_shortcut(&mut self, key: u32, mods: u32) -> Result<()> {
        let chord = NativeChord::new(key, mods);
        if key == 0 {
            bail!("no virtual key code");
        }
        // SAFETY: RegisterHotKey is an OS API; a null window binds the hotkey
        // to the calling thread's message queue.
        let result = unsafe {
            RegisterHotKey(
                HWND::default(),
                hotkey_id(key, mods),
                HOT_KEY_MODIFIERS(mods),
                key,
            )
        };
        result.map_err(|e| anyhow!("RegisterHotKey failed for {}: {}", chord, e))
    }

    fn unregister_shortcut(&mut self, key: u32, mods: u32) -> Result<()> {
        let chord = NativeChord::new(key, mods);
        // SAFETY: UnregisterHotKey is an OS API.
        let result = unsafe { UnregisterHotKey(HWND::default(), hotkey_id(key, mods)) };
        result.map_err(|e| anyhow!("UnregisterHotKey failed for {}: {}", chord, e))
    }
}
