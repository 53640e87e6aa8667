//! The native event filter slot of the current thread's event loop.
//!
//! A host loop hands every native event to [`EventDispatcher::filter_native_event`]
//! before its normal delivery. At most one filter is installed at a time;
//! whoever installs a filter receives the previous one and is responsible for
//! chaining to it and restoring it.

use crate::event::NativeEvent;
use std::cell::Cell;

/// A native event filter. Returning `true` consumes the event.
pub type EventFilter = fn(&NativeEvent) -> bool;

thread_local! {
    static FILTER: Cell<Option<EventFilter>> = const { Cell::new(None) };
    static REVISION: Cell<u64> = const { Cell::new(0) };
}

/// Per-thread event dispatcher.
///
/// The dispatcher is bound to the thread that runs the event loop; every
/// function here acts on the calling thread's slot.
pub struct EventDispatcher;

impl EventDispatcher {
    /// Replace the installed filter, returning the one it replaces.
    pub fn set_event_filter(filter: Option<EventFilter>) -> Option<EventFilter> {
        REVISION.with(|r| r.set(r.get() + 1));
        FILTER.with(|slot| slot.replace(filter))
    }

    /// The currently installed filter.
    pub fn event_filter() -> Option<EventFilter> {
        FILTER.with(Cell::get)
    }

    /// Number of times the filter slot has been replaced on this thread.
    pub fn revision() -> u64 {
        REVISION.with(Cell::get)
    }

    /// Run the installed filter on `event`. Returns `true` if it was consumed.
    ///
    /// The slot is read before the call, so a filter may replace itself.
    pub fn filter_native_event(event: &NativeEvent) -> bool {
        match Self::event_filter() {
            Some(filter) => filter(event),
            None => false,
        }
    }
}
