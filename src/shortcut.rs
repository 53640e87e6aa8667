//! The global shortcut object.

use crate::event::NativeChord;
use crate::key::Key;
use crate::pimpl::{PrivateHolder, PrivateState, PublicLink};
use crate::registry::ShortcutRegistry;
use crate::sequence::{KeySequence, Modifiers};
use crate::signal::Signal;
use std::rc::Rc;

/// A global shortcut, also known as a hotkey.
///
/// A global shortcut triggers even if the application is not active, for
/// example while it is minimized to the system tray.
///
/// Only the first chord of a sequence is bound; later chords are ignored.
/// Key press and release events are not delivered for a registered chord,
/// even while the shortcut is disabled.
///
/// # Example
///
/// ```no_run
/// use global_shortcut::{process_native_events, GlobalShortcut};
///
/// fn main() -> anyhow::Result<()> {
///     let shortcut = GlobalShortcut::new();
///     shortcut.activated().connect(|| println!("toggled"));
///     if !shortcut.set_shortcut(&"Ctrl+Shift+F12".parse()?) {
///         anyhow::bail!("Ctrl+Shift+F12 is taken");
///     }
///
///     loop {
///         // Part of the host's own event loop.
///         process_native_events();
///         std::thread::sleep(std::time::Duration::from_millis(10));
///     }
/// }
/// ```
pub struct GlobalShortcut {
    d: PrivateHolder<GlobalShortcut, GlobalShortcutPrivate>,
    activated: Signal,
}

struct GlobalShortcutPrivate {
    link: PublicLink<GlobalShortcut>,
    enabled: bool,
    key: Option<Key>,
    mods: Modifiers,
    /// Set while bound.
    native: Option<NativeChord>,
}

impl PrivateState<GlobalShortcut> for GlobalShortcutPrivate {
    fn link(&self) -> &PublicLink<GlobalShortcut> {
        &self.link
    }
}

impl GlobalShortcutPrivate {
    fn new() -> Self {
        ShortcutRegistry::with(|registry| registry.acquire());
        Self {
            link: PublicLink::new(),
            enabled: true,
            key: None,
            mods: Modifiers::NONE,
            native: None,
        }
    }

    fn sequence(&self) -> KeySequence {
        match self.key {
            Some(key) => KeySequence::from(key | self.mods),
            None => KeySequence::new(),
        }
    }

    fn clear(&mut self) {
        self.key = None;
        self.mods = Modifiers::NONE;
        self.native = None;
    }

    fn set_shortcut(&mut self, shortcut: &KeySequence) -> bool {
        let Some(chord) = shortcut.first() else {
            self.clear();
            log::debug!("GlobalShortcut given an empty key sequence, left unbound");
            return false;
        };
        if shortcut.len() > 1 {
            log::debug!("GlobalShortcut binds only {} of {}", chord, shortcut);
        }

        let (key, mods) = chord.split();
        let owner = self.link.downgrade();
        let bound = ShortcutRegistry::with(|registry| {
            let native = registry.native_chord(key, mods);
            registry.bind(native, owner).map(|()| native)
        });

        match bound {
            Ok(native) => {
                log::debug!("GlobalShortcut registered {} ({})", chord, native);
                self.key = Some(key);
                self.mods = mods;
                self.native = Some(native);
                true
            }
            Err(e) => {
                log::warn!("GlobalShortcut failed to register {}: {:#}", chord, e);
                self.clear();
                false
            }
        }
    }

    fn unset_shortcut(&mut self) -> bool {
        let Some(native) = self.native else {
            self.clear();
            return false;
        };
        let sequence = self.sequence();
        let owner = self.link.downgrade();
        let released = ShortcutRegistry::try_with(|registry| registry.unbind(native, &owner));
        self.clear();

        match released {
            None => {
                log::debug!("GlobalShortcut registry already gone, {} left as is", sequence);
                false
            }
            Some(Ok(())) => {
                log::debug!("GlobalShortcut unregistered {}", sequence);
                true
            }
            Some(Err(e)) => {
                log::warn!("GlobalShortcut failed to unregister {}: {:#}", sequence, e);
                false
            }
        }
    }
}

impl Drop for GlobalShortcutPrivate {
    fn drop(&mut self) {
        if ShortcutRegistry::try_with(|registry| registry.release()).is_none() {
            log::debug!("GlobalShortcut outlived the registry of its thread");
        }
    }
}

impl GlobalShortcut {
    /// Construct an unbound shortcut.
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|public| GlobalShortcut {
            d: PrivateHolder::attached(GlobalShortcutPrivate::new(), public),
            activated: Signal::new(),
        })
    }

    /// Construct a shortcut and try to bind `shortcut`.
    ///
    /// The result of the binding is available through [`is_bound`](Self::is_bound).
    pub fn with_shortcut(shortcut: &KeySequence) -> Rc<Self> {
        let this = Self::new();
        this.set_shortcut(shortcut);
        this
    }

    /// The bound chord, or the empty sequence when unbound.
    pub fn shortcut(&self) -> KeySequence {
        self.d.get().sequence()
    }

    /// Bind the first chord of `shortcut`, releasing any current binding
    /// first. Returns `false` if the chord could not be registered, in which
    /// case the shortcut is left unbound.
    pub fn set_shortcut(&self, shortcut: &KeySequence) -> bool {
        let mut d = self.d.get_mut();
        if d.native.is_some() {
            d.unset_shortcut();
        }
        d.set_shortcut(shortcut)
    }

    /// Release the current binding. Returns `true` only if a binding held by
    /// this shortcut was released by the OS. The shortcut is unbound
    /// afterwards in every case.
    pub fn unset_shortcut(&self) -> bool {
        self.d.get_mut().unset_shortcut()
    }

    /// Whether a chord is currently registered for this shortcut.
    pub fn is_bound(&self) -> bool {
        self.d.get().native.is_some()
    }

    /// The native pair registered with the OS, while bound.
    pub fn native_chord(&self) -> Option<NativeChord> {
        self.d.get().native
    }

    /// Whether activation is reported. Defaults to `true`.
    ///
    /// A disabled shortcut keeps its registration; it just does not emit
    /// [`activated`](Self::activated).
    pub fn is_enabled(&self) -> bool {
        self.d.get().enabled
    }

    /// Turn activation reporting on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.d.get_mut().enabled = enabled;
    }

    /// The inverse of [`set_enabled`](Self::set_enabled).
    pub fn set_disabled(&self, disabled: bool) {
        self.d.get_mut().enabled = !disabled;
    }

    /// Emitted when the user types the shortcut's chord.
    pub fn activated(&self) -> &Signal {
        &self.activated
    }
}

impl Drop for GlobalShortcut {
    fn drop(&mut self) {
        let mut d = self.d.get_mut();
        if d.native.is_some() {
            d.unset_shortcut();
        }
    }
}

impl std::fmt::Debug for GlobalShortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let d = self.d.get();
        f.debug_struct("GlobalShortcut")
            .field("shortcut", &d.sequence().to_string())
            .field("native", &d.native)
            .field("enabled", &d.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NativeBackend;
    use crate::dispatcher::EventDispatcher;
    use crate::event::NativeEvent;
    use crate::headless::{HeadlessBackend, MOD_CTRL, MOD_SHIFT};
    use crate::registry::{bound_chords, process_native_events, RegistryBuilder};
    use std::cell::{Cell, RefCell};

    fn headless() -> HeadlessBackend {
        let backend = HeadlessBackend::new();
        RegistryBuilder::new()
            .backend(backend.clone())
            .install()
            .unwrap();
        backend
    }

    fn seq(s: &str) -> KeySequence {
        s.parse().unwrap()
    }

    fn count_activations(shortcut: &GlobalShortcut) -> Rc<Cell<usize>> {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        shortcut
            .activated()
            .connect(move || counter.set(counter.get() + 1));
        hits
    }

    #[test]
    fn test_end_to_end_ctrl_shift_f12() {
        let backend = headless();
        let shortcut = GlobalShortcut::with_shortcut(&seq("Ctrl+Shift+F12"));
        let hits = count_activations(&shortcut);

        let (key, mods) = shortcut.shortcut()[0].split();
        assert_eq!(key, Key::F12);
        assert_eq!(mods, Modifiers::CTRL | Modifiers::SHIFT);
        assert!(shortcut.is_bound());

        let native = NativeChord::new(Key::F12.code(), MOD_CTRL | MOD_SHIFT);
        assert_eq!(shortcut.native_chord(), Some(native));
        assert_eq!(bound_chords(), vec![native]);
        assert_eq!(backend.registered(), vec![native]);

        EventDispatcher::filter_native_event(&NativeEvent::hotkey(native));
        assert_eq!(hits.get(), 1);

        drop(shortcut);
        assert!(bound_chords().is_empty());
        assert!(backend.registered().is_empty());
    }

    #[test]
    fn test_defaults() {
        headless();
        let shortcut = GlobalShortcut::new();
        assert!(shortcut.is_enabled());
        assert!(!shortcut.is_bound());
        assert!(shortcut.shortcut().is_empty());
        assert_eq!(shortcut.native_chord(), None);
    }

    #[test]
    fn test_only_first_chord_is_bound() {
        let backend = headless();
        let shortcut = GlobalShortcut::new();
        assert!(shortcut.set_shortcut(&seq("Ctrl+Alt+A, Ctrl+Alt+B")));
        assert_eq!(shortcut.shortcut(), seq("Ctrl+Alt+A"));
        assert_eq!(backend.registered().len(), 1);
    }

    #[test]
    fn test_same_chord_conflicts_in_process() {
        let backend = headless();
        let a = GlobalShortcut::with_shortcut(&seq("Ctrl+Shift+F12"));
        let b = GlobalShortcut::with_shortcut(&seq("Alt+X"));
        assert!(a.is_bound());
        assert!(b.is_bound());

        assert!(!b.set_shortcut(&seq("Shift+Ctrl+F12")));
        assert!(!b.is_bound());
        assert!(b.shortcut().is_empty());

        // `a` keeps its binding; the OS was never asked about the duplicate.
        assert!(a.is_bound());
        assert_eq!(a.shortcut(), seq("Ctrl+Shift+F12"));
        assert_eq!(backend.register_calls(), 2);
        assert_eq!(bound_chords(), vec![a.native_chord().unwrap()]);
    }

    #[test]
    fn test_foreign_claim_fails_and_stays_silent() {
        let backend = headless();
        backend.claim_foreign(backend.native_chord(Key::P, Modifiers::META));
        let shortcut = GlobalShortcut::new();
        let hits = count_activations(&shortcut);

        assert!(!shortcut.set_shortcut(&seq("Meta+P")));
        assert!(!shortcut.is_bound());
        assert!(shortcut.shortcut().is_empty());
        assert_eq!(backend.register_calls(), 1);

        backend.press(Key::P, Modifiers::META);
        process_native_events();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_empty_sequence_unbinds_without_os_call() {
        let backend = headless();
        let shortcut = GlobalShortcut::with_shortcut(&seq("F5"));
        assert!(!shortcut.set_shortcut(&KeySequence::new()));
        assert!(!shortcut.is_bound());
        assert_eq!(backend.register_calls(), 1);
        assert_eq!(backend.unregister_calls(), 1);
        assert!(backend.registered().is_empty());
    }

    #[test]
    fn test_rebinding_releases_previous() {
        let backend = headless();
        let shortcut = GlobalShortcut::with_shortcut(&seq("F5"));
        assert!(shortcut.set_shortcut(&seq("F6")));
        assert_eq!(
            backend.registered(),
            vec![backend.native_chord(Key::F6, Modifiers::NONE)]
        );
        assert_eq!(bound_chords().len(), 1);
    }

    #[test]
    fn test_unset_is_idempotent() {
        let backend = headless();
        let shortcut = GlobalShortcut::with_shortcut(&seq("Ctrl+Q"));
        assert!(shortcut.unset_shortcut());
        assert!(!shortcut.is_bound());
        assert!(!shortcut.unset_shortcut());
        assert!(!shortcut.is_bound());
        assert_eq!(backend.unregister_calls(), 1);

        let fresh = GlobalShortcut::new();
        assert!(!fresh.unset_shortcut());
        assert_eq!(backend.unregister_calls(), 1);
    }

    #[test]
    fn test_failed_unregister_still_unbinds() {
        let backend = headless();
        let shortcut = GlobalShortcut::with_shortcut(&seq("Ctrl+Q"));
        backend.set_fail_unregister(true);

        assert!(!shortcut.unset_shortcut());
        assert!(!shortcut.is_bound());
        assert!(shortcut.shortcut().is_empty());
        assert!(bound_chords().is_empty());
    }

    #[test]
    fn test_drop_frees_chord_for_new_owner() {
        headless();
        let first = GlobalShortcut::with_shortcut(&seq("Alt+F4"));
        assert!(first.is_bound());
        drop(first);

        let second = GlobalShortcut::new();
        assert!(second.set_shortcut(&seq("Alt+F4")));
    }

    #[test]
    fn test_disabled_keeps_registration() {
        let backend = headless();
        let shortcut = GlobalShortcut::with_shortcut(&seq("Ctrl+Space"));
        let hits = count_activations(&shortcut);

        shortcut.set_enabled(false);
        backend.press(Key::Space, Modifiers::CTRL);
        process_native_events();
        assert_eq!(hits.get(), 0);
        assert!(shortcut.is_bound());
        assert_eq!(backend.registered().len(), 1);

        shortcut.set_disabled(false);
        assert!(shortcut.is_enabled());
        backend.press(Key::Space, Modifiers::CTRL);
        process_native_events();
        assert_eq!(hits.get(), 1);
        assert_eq!(backend.register_calls(), 1);
    }

    #[test]
    fn test_each_event_activates_once() {
        headless();
        let first = GlobalShortcut::with_shortcut(&seq("Ctrl+1"));
        let second = GlobalShortcut::with_shortcut(&seq("Ctrl+2"));
        let first_hits = count_activations(&first);
        let second_hits = count_activations(&second);

        let event = NativeEvent::hotkey(first.native_chord().unwrap());
        EventDispatcher::filter_native_event(&event);
        EventDispatcher::filter_native_event(&event);
        assert_eq!(first_hits.get(), 2);
        assert_eq!(second_hits.get(), 0);

        EventDispatcher::filter_native_event(&NativeEvent::Message(0x0312));
        assert_eq!(first_hits.get(), 2);
    }

    #[test]
    fn test_slot_may_reenter() {
        let backend = headless();
        let shortcut = GlobalShortcut::with_shortcut(&seq("Shift+Escape"));
        let hits = count_activations(&shortcut);
        let weak = Rc::downgrade(&shortcut);
        shortcut.activated().connect(move || {
            if let Some(shortcut) = weak.upgrade() {
                shortcut.set_disabled(true);
            }
        });

        backend.press(Key::Escape, Modifiers::SHIFT);
        backend.press(Key::Escape, Modifiers::SHIFT);
        process_native_events();
        assert_eq!(hits.get(), 1);
        assert!(!shortcut.is_enabled());
    }

    #[test]
    fn test_slot_may_drop_last_handle() {
        let backend = headless();
        let holder: Rc<RefCell<Option<Rc<GlobalShortcut>>>> = Rc::default();
        let shortcut = GlobalShortcut::with_shortcut(&seq("Ctrl+D"));
        let slot_holder = Rc::clone(&holder);
        shortcut.activated().connect(move || {
            slot_holder.borrow_mut().take();
        });
        *holder.borrow_mut() = Some(shortcut);

        backend.press(Key::D, Modifiers::CTRL);
        process_native_events();
        assert!(holder.borrow().is_none());
        assert!(bound_chords().is_empty());
        assert!(backend.registered().is_empty());
        assert!(EventDispatcher::event_filter().is_none());
    }

    thread_local! {
        static HOLDER: RefCell<Option<Rc<GlobalShortcut>>> = const { RefCell::new(None) };
    }

    #[test]
    fn test_shortcut_in_thread_local_outlives_registry() {
        // HOLDER is touched before the registry, so it is destroyed after it.
        let handle = std::thread::spawn(|| {
            HOLDER.with(|holder| {
                headless();
                let shortcut = GlobalShortcut::with_shortcut(&seq("Ctrl+A"));
                assert!(shortcut.is_bound());
                *holder.borrow_mut() = Some(shortcut);
            });
        });
        assert!(handle.join().is_ok());
    }

    #[test]
    fn test_debug_output() {
        headless();
        let shortcut = GlobalShortcut::with_shortcut(&seq("Ctrl+K"));
        let text = format!("{:?}", shortcut);
        assert!(text.contains("Ctrl+K"));
        assert!(text.contains("enabled: true"));
    }
}
