//! The per-thread global shortcut registry.
//!
//! The registry owns the native backend and maps every bound native chord to
//! the [`GlobalShortcut`] holding it. It also counts live shortcuts: the first
//! one installs the activation filter into the [`EventDispatcher`], the last
//! one puts the previous filter back.
//!
//! The registry belongs to the thread running the event loop. Shortcuts,
//! the filter and the backend are all created and used on that thread.

use crate::backend::{default_backend, NativeBackend};
use crate::dispatcher::{EventDispatcher, EventFilter};
use crate::event::{NativeChord, NativeEvent};
use crate::key::Key;
use crate::sequence::Modifiers;
use crate::shortcut::GlobalShortcut;
use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

thread_local! {
    static REGISTRY: RefCell<ShortcutRegistry> = RefCell::new(ShortcutRegistry::new());
}

/// Builder for configuring the current thread's registry.
///
/// # Example
///
/// ```
/// use global_shortcut::{GlobalShortcut, HeadlessBackend, RegistryBuilder};
///
/// let backend = HeadlessBackend::new();
/// RegistryBuilder::new().backend(backend.clone()).install().unwrap();
///
/// let shortcut = GlobalShortcut::with_shortcut(&"Ctrl+Shift+F12".parse().unwrap());
/// assert!(shortcut.is_bound());
/// assert_eq!(backend.registered().len(), 1);
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    backend: Option<Box<dyn NativeBackend>>,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `backend` instead of the platform default.
    pub fn backend(self, backend: impl NativeBackend + 'static) -> Self {
        self.boxed_backend(Box::new(backend))
    }

    /// Same as [`backend`](Self::backend), for an already boxed backend.
    pub fn boxed_backend(mut self, backend: Box<dyn NativeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Apply the configuration to this thread's registry.
    ///
    /// Fails while any shortcut is alive on this thread, since their
    /// bindings belong to the backend being replaced.
    pub fn install(self) -> Result<()> {
        let backend = self.backend.unwrap_or_else(default_backend);
        ShortcutRegistry::with(|registry| {
            if registry.live > 0 {
                bail!(
                    "Cannot replace the {} backend while {} shortcut(s) are alive",
                    registry.backend_name().unwrap_or("default"),
                    registry.live
                );
            }
            log::info!("Using {} global shortcut backend", backend.name());
            registry.backend = Some(backend);
            Ok(())
        })
    }
}

pub(crate) struct ShortcutRegistry {
    backend: Option<Box<dyn NativeBackend>>,
    bindings: HashMap<NativeChord, Weak<GlobalShortcut>>,
    live: usize,
    prev_filter: Option<EventFilter>,
}

impl ShortcutRegistry {
    fn new() -> Self {
        Self {
            backend: None,
            bindings: HashMap::new(),
            live: 0,
            prev_filter: None,
        }
    }

    pub(crate) fn with<R>(f: impl FnOnce(&mut ShortcutRegistry) -> R) -> R {
        REGISTRY.with(|registry| f(&mut registry.borrow_mut()))
    }

    /// Like [`with`](Self::with), but returns `None` once the thread's
    /// registry has been torn down. Used on destruction paths, which may run
    /// from other thread-local destructors.
    pub(crate) fn try_with<R>(f: impl FnOnce(&mut ShortcutRegistry) -> R) -> Option<R> {
        REGISTRY
            .try_with(|registry| f(&mut registry.borrow_mut()))
            .ok()
    }

    fn backend(&mut self) -> &mut dyn NativeBackend {
        self.backend
            .get_or_insert_with(|| {
                let backend = default_backend();
                log::debug!("Using {} global shortcut backend", backend.name());
                backend
            })
            .as_mut()
    }

    fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|backend| backend.name())
    }

    /// A new shortcut exists. Installs the activation filter on the first.
    pub(crate) fn acquire(&mut self) {
        if self.live == 0 {
            self.prev_filter = EventDispatcher::set_event_filter(Some(activation_filter));
            log::debug!("Installed global shortcut event filter");
        }
        self.live += 1;
    }

    /// A shortcut was destroyed. Restores the previous filter after the last.
    pub(crate) fn release(&mut self) {
        debug_assert!(self.live > 0, "more shortcuts released than created");
        self.live = self.live.saturating_sub(1);
        if self.live == 0 {
            EventDispatcher::set_event_filter(self.prev_filter.take());
            log::debug!("Restored previous event filter");
        }
    }

    pub(crate) fn native_chord(&mut self, key: Key, mods: Modifiers) -> NativeChord {
        self.backend().native_chord(key, mods)
    }

    /// Register `chord` with the OS on behalf of `owner`.
    ///
    /// A chord already bound in this process is refused without asking the OS.
    pub(crate) fn bind(&mut self, chord: NativeChord, owner: Weak<GlobalShortcut>) -> Result<()> {
        if self.bindings.contains_key(&chord) {
            bail!("{} is already bound by another shortcut", chord);
        }
        self.backend().register_shortcut(chord.key, chord.mods)?;
        self.bindings.insert(chord, owner);
        Ok(())
    }

    /// Release `chord` if `owner` holds it.
    ///
    /// Once the owner matches, the entry is dropped even if the OS refuses,
    /// so the registry never outlives the shortcut's own state.
    pub(crate) fn unbind(
        &mut self,
        chord: NativeChord,
        owner: &Weak<GlobalShortcut>,
    ) -> Result<()> {
        match self.bindings.get(&chord) {
            Some(bound) if Weak::ptr_eq(bound, owner) => {}
            _ => bail!("{} is not bound to this shortcut", chord),
        }
        self.bindings.remove(&chord);
        self.backend().unregister_shortcut(chord.key, chord.mods)
    }

    fn owner(&self, chord: NativeChord) -> Option<Rc<GlobalShortcut>> {
        self.bindings.get(&chord).and_then(Weak::upgrade)
    }
}

/// The filter installed while shortcuts are alive.
///
/// Hotkey events activate their bound, enabled shortcut. Every event is then
/// offered to the filter that was installed before this one.
fn activation_filter(event: &NativeEvent) -> bool {
    let prev = ShortcutRegistry::with(|registry| registry.prev_filter);
    if let Some(chord) = event.hotkey_chord() {
        activate(chord);
    }
    match prev {
        Some(filter) => filter(event),
        None => false,
    }
}

fn activate(chord: NativeChord) {
    let Some(shortcut) = ShortcutRegistry::with(|registry| registry.owner(chord)) else {
        log::debug!("No shortcut bound to {}", chord);
        return;
    };
    if shortcut.is_enabled() {
        shortcut.activated().emit();
    }
}

/// Deliver the hotkey events the backend collected since the last call.
///
/// Backends that read input on their own threads (evdev, rdev) queue events;
/// the host loop calls this on its own thread to run them through the event
/// filter. Returns the number of events delivered.
pub fn process_native_events() -> usize {
    let events = ShortcutRegistry::with(|registry| match registry.backend.as_mut() {
        Some(backend) => backend.take_events(),
        None => Vec::new(),
    });
    for event in &events {
        EventDispatcher::filter_native_event(event);
    }
    events.len()
}

/// Number of shortcuts alive on this thread, bound or not.
pub fn live_shortcuts() -> usize {
    ShortcutRegistry::with(|registry| registry.live)
}

/// Native chords currently bound on this thread, in sorted order.
pub fn bound_chords() -> Vec<NativeChord> {
    let mut chords: Vec<NativeChord> =
        ShortcutRegistry::with(|registry| registry.bindings.keys().copied().collect());
    chords.sort();
    chords
}

/// The shortcut bound to `chord`, if any.
pub fn owner_of(chord: NativeChord) -> Option<Rc<GlobalShortcut>> {
    ShortcutRegistry::with(|registry| registry.owner(chord))
}

/// Name of the backend in use, once one has been chosen.
pub fn backend_name() -> Option<&'static str> {
    ShortcutRegistry::with(|registry| registry.backend_name())
}
