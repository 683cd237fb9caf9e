//! Subscribe/notify plumbing for the engine's state slices.
//!
//! Listeners are stored as weak references; the caller holds the strong side
//! inside a [`Subscription`] guard. Dropping the guard unsubscribes. Dead
//! entries are pruned on the next notify. Single-threaded by construction.

use std::any::Any;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

/// Keeps a listener alive. Drop it to unsubscribe.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// A list of listeners for values of type `T`, notified in registration order.
pub struct Listeners<T> {
    entries: Vec<CallbackWeak<T>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> std::fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback.
    pub fn subscribe(&mut self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.entries.push(Rc::downgrade(&strong));
        // Rc<dyn Fn> cannot coerce to dyn Any; box the Rc itself.
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Invoke every live listener with `value`, pruning dead ones.
    pub fn notify(&mut self, value: &T) {
        self.entries.retain(|w| w.strong_count() > 0);
        let live: Vec<CallbackRc<T>> = self.entries.iter().filter_map(Weak::upgrade).collect();
        for callback in live {
            callback(value);
        }
    }

    /// Registered listeners, including dead ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
