//! Listener lists for the notifications the engine emits.
//!
//! A [`ListenerList`] only keeps weak references to its callbacks. The strong reference lives
//! in the [`Listener`] handle returned on registration, so dropping the handle unsubscribes.

use std::{
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicUsize, Ordering},
    },
};

use crossbeam_skiplist::SkipSet;

type Callback<E> = dyn Fn(&E) -> <E as Event>::HandlerReturnType + Send + Sync;

/// An event that can be dispatched to listeners.
pub trait Event: fmt::Debug + Send + Sync {
    /// What a listener hands back after seeing the event.
    type HandlerReturnType: fmt::Debug;

    /// Folds a listener's return value into the event before the next listener sees it.
    ///
    /// The default implementation ignores the value.
    fn update(&mut self, _handler_result: Self::HandlerReturnType) {}
}

struct ListenerEntry<E: Event> {
    callback: Weak<Callback<E>>,
    order: usize,
}

impl<E: Event> Eq for ListenerEntry<E> {}

impl<E: Event> PartialEq for ListenerEntry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl<E: Event> Ord for ListenerEntry<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.order.cmp(&other.order)
    }
}

impl<E: Event> PartialOrd for ListenerEntry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

static NEXT_LISTENER: AtomicUsize = AtomicUsize::new(0);

/// Listeners for one event type, called in registration order.
pub struct ListenerList<E: Event> {
    inner: SkipSet<ListenerEntry<E>>,
}

impl<E: Event + 'static> ListenerList<E> {
    pub fn new() -> Self {
        ListenerList {
            inner: SkipSet::new(),
        }
    }

    /// Number of registrations, including dropped ones not yet pruned by a dispatch.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Calls every live listener in order, pruning the ones whose handle was dropped.
    ///
    /// Only the crate emits events.
    pub(crate) fn dispatch(&self, event: &mut E) {
        for entry in self.inner.iter() {
            match entry.value().callback.upgrade() {
                Some(callback) => {
                    let result = callback(event);
                    event.update(result);
                }
                None => {
                    entry.remove();
                }
            }
        }
    }

    /// Dispatches `event` and hands it back with all listener results folded in.
    pub(crate) fn emit(&self, mut event: E) -> E {
        self.dispatch(&mut event);
        event
    }
}

impl<E: Event + 'static> Default for ListenerList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for ListenerList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList")
            .field("listener_count", &self.inner.len())
            .finish()
    }
}

/// An active registration. Dropping it deregisters the callback.
pub struct Listener<E: Event> {
    _callback: Arc<Callback<E>>,
    order: usize,
}

impl<E: Event + 'static> Listener<E> {
    /// Registers `callback` with `listeners`.
    ///
    /// Keep the returned handle alive for as long as the callback should be called.
    pub fn new<F>(listeners: &ListenerList<E>, callback: F) -> Self
    where
        F: Fn(&E) -> E::HandlerReturnType + Send + Sync + 'static,
    {
        let order = NEXT_LISTENER.fetch_add(1, Ordering::SeqCst);
        let callback: Arc<Callback<E>> = Arc::new(callback);
        listeners.inner.insert(ListenerEntry {
            callback: Arc::downgrade(&callback),
            order,
        });

        Listener {
            _callback: callback,
            order,
        }
    }
}

impl<E: Event> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("order", &self.order).finish()
    }
}

/// Defines a struct with one public [`ListenerList`] field per event type.
macro_rules! define_event_listeners {
    ($(#[$meta:meta])* $struct_name:ident { $($field_name:ident: $event_type:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        pub struct $struct_name {
            $(
                pub $field_name: $crate::event::ListenerList<$event_type>,
            )*
        }

        impl $struct_name {
            pub fn new() -> Self {
                Self {
                    $(
                        $field_name: $crate::event::ListenerList::new(),
                    )*
                }
            }
        }
    };
}

pub(crate) use define_event_listeners;

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug)]
    struct Counted(i32);
    impl Event for Counted {
        type HandlerReturnType = i32;

        fn update(&mut self, value: i32) {
            self.0 += value;
        }
    }

    #[derive(Debug)]
    struct Claimed(bool);
    impl Event for Claimed {
        type HandlerReturnType = bool;

        fn update(&mut self, handled: bool) {
            self.0 |= handled;
        }
    }

    define_event_listeners!(TestEvents {
        counted: Counted,
        claimed: Claimed,
    });

    #[test]
    fn test_results_are_folded_into_event() {
        let events = TestEvents::new();
        let _a = Listener::new(&events.counted, |_| 10);
        let _b = Listener::new(&events.counted, |_| 5);

        assert_eq!(events.counted.emit(Counted(100)).0, 115);

        assert!(!events.claimed.emit(Claimed(false)).0);
        let _c = Listener::new(&events.claimed, |_| true);
        assert!(events.claimed.emit(Claimed(false)).0);
    }

    #[test]
    fn test_dropped_listener_is_pruned_on_dispatch() {
        let events = TestEvents::new();
        {
            let _temp = Listener::new(&events.counted, |_| 1);
            assert_eq!(events.counted.len(), 1);
        }
        assert_eq!(events.counted.len(), 1);

        let event = events.counted.emit(Counted(0));
        assert_eq!(event.0, 0);
        assert!(events.counted.is_empty());
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let events = TestEvents::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = ["A", "B", "C"]
            .into_iter()
            .map(|name| {
                let calls = calls.clone();
                Listener::new(&events.counted, move |_| {
                    calls.lock().unwrap().push(name);
                    0
                })
            })
            .collect();

        events.counted.emit(Counted(0));
        assert_eq!(*calls.lock().unwrap(), vec!["A", "B", "C"]);
        drop(handles);
    }
}
