//! The platform side of a global shortcut: key translation and native
//! hotkey registration.

use crate::event::{NativeChord, NativeEvent};
use crate::key::Key;
use crate::sequence::Modifiers;
use anyhow::Result;

/// A platform's native hotkey API.
///
/// Backends are owned by the shortcut registry of the event-loop thread and
/// are only called from that thread.
pub trait NativeBackend {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Native code for `key`, or 0 if the platform has no such key.
    fn native_keycode(&self, key: Key) -> u32;

    /// Native modifier mask for `mods`.
    fn native_modifiers(&self, mods: Modifiers) -> u32;

    /// Ask the OS to deliver `(key, mods)` to this process globally.
    fn register_shortcut(&mut self, key: u32, mods: u32) -> Result<()>;

    /// Release a pair previously accepted by `register_shortcut`.
    fn unregister_shortcut(&mut self, key: u32, mods: u32) -> Result<()>;

    /// Hotkey events collected since the last call.
    ///
    /// Backends whose OS delivers hotkeys through the host's own message
    /// loop return nothing here.
    fn take_events(&mut self) -> Vec<NativeEvent> {
        Vec::new()
    }

    /// Translate a portable chord into the pair this backend registers.
    fn native_chord(&self, key: Key, mods: Modifiers) -> NativeChord {
        NativeChord::new(self.native_keycode(key), self.native_modifiers(mods))
    }
}

/// The backend for the platform this crate was built for.
#[cfg(target_os = "linux")]
pub fn default_backend() -> Box<dyn NativeBackend> {
    Box::new(crate::linux::LinuxBackend::new())
}

/// The backend for the platform this crate was built for.
#[cfg(target_os = "macos")]
pub fn default_backend() -> Box<dyn NativeBackend> {
    Box::new(crate::macos::MacosBackend::new())
}

/// The backend for the platform this crate was built for.
#[cfg(target_os = "windows")]
pub fn default_backend() -> Box<dyn NativeBackend> {
    Box::new(crate::win32::WindowsBackend::new())
}

/// Fallback for platforms without a native backend.
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub fn default_backend() -> Box<dyn NativeBackend> {
    log::warn!("Global shortcuts are not supported on this platform, using headless backend");
    Box::new(crate::headless::HeadlessBackend::new())
}
