//! A minimal single-threaded signal with no payload.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by [`Signal::connect`], used to disconnect the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

/// A list of slots invoked in connection order on [`Signal::emit`].
#[derive(Default)]
pub struct Signal {
    slots: RefCell<Vec<(SlotId, Rc<dyn Fn()>)>>,
    next_id: Cell<u64>,
}

impl Signal {
    /// Create a signal with no slots.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect<F>(&self, slot: F) -> SlotId
    where
        F: Fn() + 'static,
    {
        let id = SlotId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.slots.borrow_mut().push((id, Rc::new(slot)));
        id
    }

    /// Remove a slot. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: SlotId) -> bool {
        let mut slots = self.slots.borrow_mut();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    pub fn slot_count(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Invoke every connected slot once.
    ///
    /// Slots see a snapshot of the connection list, so they may connect or
    /// disconnect while the signal is being emitted.
    pub fn emit(&self) {
        let snapshot: Vec<Rc<dyn Fn()>> = self
            .slots
            .borrow()
            .iter()
            .map(|(_, slot)| Rc::clone(slot))
            .collect();
        for slot in snapshot {
            slot();
        }
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slot_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_calls_slots_in_order() {
        let signal = Signal::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&log);
        let second = Rc::clone(&log);
        signal.connect(move || first.borrow_mut().push(1));
        signal.connect(move || second.borrow_mut().push(2));

        signal.emit();
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = signal.connect(move || counter.set(counter.get() + 1));

        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit();
        assert_eq!(hits.get(), 0);
        assert_eq!(signal.slot_count(), 0);
    }

    #[test]
    fn test_slot_can_connect_during_emit() {
        let signal = Rc::new(Signal::new());
        let inner = Rc::clone(&signal);
        signal.connect(move || {
            inner.connect(|| {});
        });

        signal.emit();
        assert_eq!(signal.slot_count(), 2);
    }
}
