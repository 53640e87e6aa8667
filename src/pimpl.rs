//! Private-state holder for public types.
//!
//! A public type `P` keeps its mutable state in a separately allocated `D`
//! held by a [`PrivateHolder`]. `D` carries a [`PublicLink`] back to its
//! owner, attached once while `P` is being built with [`Rc::new_cyclic`].
//!
//! ```
//! use global_shortcut::pimpl::{PrivateHolder, PrivateState, PublicLink};
//! use std::rc::Rc;
//!
//! struct Counter {
//!     d: PrivateHolder<Counter, CounterPrivate>,
//! }
//!
//! #[derive(Default)]
//! struct CounterPrivate {
//!     link: PublicLink<Counter>,
//!     value: u32,
//! }
//!
//! impl PrivateState<Counter> for CounterPrivate {
//!     fn link(&self) -> &PublicLink<Counter> {
//!         &self.link
//!     }
//! }
//!
//! let counter = Rc::new_cyclic(|public| Counter {
//!     d: PrivateHolder::attached(CounterPrivate::default(), public),
//! });
//! counter.d.get_mut().value += 1;
//! assert_eq!(counter.d.get().value, 1);
//! assert!(Rc::ptr_eq(&counter.d.get().link.public().unwrap(), &counter));
//! ```
//!
//! The holder owns its state exclusively and cannot be cloned:
//!
//! ```compile_fail
//! use global_shortcut::pimpl::{PrivateHolder, PublicLink};
//!
//! struct Owner;
//! let holder: PrivateHolder<Owner, PublicLink<Owner>> = PrivateHolder::new(PublicLink::new());
//! let copy: PrivateHolder<Owner, PublicLink<Owner>> = holder.clone();
//! ```

use std::cell::{OnceCell, Ref, RefCell, RefMut};
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

/// Non-owning back-reference from private state to its public owner.
pub struct PublicLink<P> {
    public: OnceCell<Weak<P>>,
}

impl<P> PublicLink<P> {
    pub const fn new() -> Self {
        Self {
            public: OnceCell::new(),
        }
    }

    /// Store the owner. Must happen exactly once, before any access.
    pub fn attach(&self, public: Weak<P>) {
        let fresh = self.public.set(public).is_ok();
        debug_assert!(fresh, "private state attached to its owner twice");
    }

    /// Whether [`attach`](Self::attach) has been called.
    pub fn is_attached(&self) -> bool {
        self.public.get().is_some()
    }

    /// The owner, or `None` once it has started dropping.
    pub fn public(&self) -> Option<Rc<P>> {
        debug_assert!(self.is_attached(), "private state used before attach");
        self.public.get().and_then(Weak::upgrade)
    }

    /// A weak handle to the owner, usable while the owner drops.
    pub fn downgrade(&self) -> Weak<P> {
        debug_assert!(self.is_attached(), "private state used before attach");
        self.public.get().cloned().unwrap_or_default()
    }

    /// Whether `other` refers to this link's owner. Does not upgrade.
    pub fn is(&self, other: &Weak<P>) -> bool {
        self.public
            .get()
            .is_some_and(|public| Weak::ptr_eq(public, other))
    }
}

impl<P> Default for PublicLink<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for PublicLink<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicLink")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Capability every private state type provides: access to its back-link.
pub trait PrivateState<P> {
    fn link(&self) -> &PublicLink<P>;
}

impl<P> PrivateState<P> for PublicLink<P> {
    fn link(&self) -> &PublicLink<P> {
        self
    }
}

/// Owns exactly one heap-allocated private state `D` for a public `P`.
pub struct PrivateHolder<P, D> {
    private: Box<RefCell<D>>,
    _public: PhantomData<fn() -> P>,
}

impl<P, D: PrivateState<P>> PrivateHolder<P, D> {
    /// Box the private state. [`attach`](Self::attach) must follow before use.
    pub fn new(private: D) -> Self {
        Self {
            private: Box::new(RefCell::new(private)),
            _public: PhantomData,
        }
    }

    /// Box the private state and attach it to `public` in one step.
    pub fn attached(private: D, public: &Weak<P>) -> Self {
        let holder = Self::new(private);
        holder.attach(public.clone());
        holder
    }

    /// Give the private state its back-reference to `public`. Call once.
    pub fn attach(&self, public: Weak<P>) {
        self.private.borrow().link().attach(public);
    }

    /// Read-only access to the private state.
    pub fn get(&self) -> Ref<'_, D> {
        let private = self.private.borrow();
        debug_assert!(private.link().is_attached(), "private state used before attach");
        private
    }

    /// Mutable access to the private state.
    pub fn get_mut(&self) -> RefMut<'_, D> {
        let private = self.private.borrow_mut();
        debug_assert!(private.link().is_attached(), "private state used before attach");
        private
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget {
        d: PrivateHolder<Widget, WidgetPrivate>,
        name: &'static str,
    }

    #[derive(Default)]
    struct WidgetPrivate {
        link: PublicLink<Widget>,
        clicks: u32,
    }

    impl PrivateState<Widget> for WidgetPrivate {
        fn link(&self) -> &PublicLink<Widget> {
            &self.link
        }
    }

    impl WidgetPrivate {
        fn owner_name(&self) -> &'static str {
            self.link.public().map(|w| w.name).unwrap_or("gone")
        }
    }

    fn widget(name: &'static str) -> Rc<Widget> {
        Rc::new_cyclic(|public| Widget {
            d: PrivateHolder::attached(WidgetPrivate::default(), public),
            name,
        })
    }

    #[test]
    fn test_private_reaches_public() {
        let w = widget("ok");
        assert_eq!(w.d.get().owner_name(), "ok");
    }

    #[test]
    fn test_mutable_access() {
        let w = widget("clicky");
        w.d.get_mut().clicks += 2;
        assert_eq!(w.d.get().clicks, 2);
    }

    #[test]
    fn test_identity() {
        let a = widget("a");
        let b = widget("b");
        assert!(a.d.get().link.is(&Rc::downgrade(&a)));
        assert!(!a.d.get().link.is(&Rc::downgrade(&b)));
    }

    #[test]
    fn test_owner_gone_after_drop() {
        let w = widget("short");
        let weak = w.d.get().link.downgrade();
        drop(w);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "before attach")]
    fn test_access_before_attach_asserts() {
        let holder: PrivateHolder<Widget, WidgetPrivate> =
            PrivateHolder::new(WidgetPrivate::default());
        let _ = holder.get();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "attached to its owner twice")]
    fn test_double_attach_asserts() {
        let w = widget("twice");
        w.d.attach(Rc::downgrade(&w));
    }
}
