//! Process-wide global keyboard shortcuts.
//!
//! A [`GlobalShortcut`] binds a key chord such as `Ctrl+Shift+F12` with the
//! operating system and emits [`activated`](GlobalShortcut::activated) when
//! the user types it, even while another application has focus.
//!
//! # Features
//!
//! - **One owner per chord** - a chord bound in this process cannot be bound
//!   twice; the OS is not even asked
//! - **Event filter hook** - the first live shortcut installs an activation
//!   filter into the thread's [`EventDispatcher`], the last one restores the
//!   previous filter
//! - **Native backends** - Win32 `RegisterHotKey`, evdev on Linux (X11 and
//!   Wayland), rdev on macOS, plus a [`HeadlessBackend`] for tests
//! - **Private state helper** - the [`pimpl`] module, used by the shortcut
//!   type itself
//!
//! # Threading
//!
//! Shortcuts, the registry and the event filter live on the thread that
//! runs the host's event loop. Activation happens synchronously inside the
//! filter call, on that thread.
//!
//! # Example
//!
//! ```
//! use global_shortcut::{EventDispatcher, GlobalShortcut, HeadlessBackend, RegistryBuilder};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! fn main() -> anyhow::Result<()> {
//!     RegistryBuilder::new().backend(HeadlessBackend::new()).install()?;
//!
//!     let shortcut = GlobalShortcut::with_shortcut(&"Ctrl+Shift+F12".parse()?);
//!     let fired = Rc::new(Cell::new(0));
//!     let counter = Rc::clone(&fired);
//!     shortcut.activated().connect(move || counter.set(counter.get() + 1));
//!
//!     // What the host loop does with a hotkey event from the OS.
//!     let chord = shortcut.native_chord().expect("bound");
//!     EventDispatcher::filter_native_event(&global_shortcut::NativeEvent::hotkey(chord));
//!     assert_eq!(fired.get(), 1);
//!     Ok(())
//! }
//! ```

mod backend;
mod dispatcher;
mod event;
pub mod headless;
mod key;
pub mod pimpl;
pub mod registry;
mod sequence;
mod shortcut;
mod signal;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod win32;

pub use backend::{default_backend, NativeBackend};
pub use dispatcher::{EventDispatcher, EventFilter};
pub use event::{NativeChord, NativeEvent};
pub use headless::HeadlessBackend;
pub use key::Key;
pub use registry::{process_native_events, RegistryBuilder};
pub use sequence::{Chord, KeySequence, Modifiers};
pub use shortcut::GlobalShortcut;
pub use signal::{Signal, SlotId};

#[cfg(target_os = "linux")]
pub use linux::{find_keyboards, LinuxBackend};

#[cfg(target_os = "macos")]
pub use macos::MacosBackend;

#[cfg(target_os = "windows")]
pub use win32::WindowsBackend;

/// Version of this crate.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert_eq!(super::version(), "0.6.2");
    }
}
