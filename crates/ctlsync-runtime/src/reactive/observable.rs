#![forbid(unsafe_code)]

//! Version-tracked observable values.
//!
//! # Failure Modes
//!
//! - **Subscriber panics**: the panic propagates out of the call that stored
//!   the value. The value and version are already updated; subscribers after
//!   the panicking one are not called for that change.
//! - **Re-entrant access**: subscribers receive a clone of the value and no
//!   borrow is held while they run, so they may read or write the same
//!   observable. Writing from inside [`Observable::with`] panics.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ctlsync_core::Subscription;

type Callback<T> = dyn Fn(&T);

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// A shared value that notifies subscribers when it is replaced.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// A clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference.
    ///
    /// # Panics
    ///
    /// Panics if `f` stores into this observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of values stored since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Store `value` and notify subscribers unconditionally.
    pub fn replace(&self, value: T) {
        self.store(value);
        self.notify();
    }

    /// Store `value` without notifying anyone.
    ///
    /// Used when the reader is the one producing the value (e.g. during a
    /// render), so a notification would only schedule a redundant pass.
    pub fn replace_quiet(&self, value: T) {
        self.store(value);
    }

    /// Register `callback` for every subsequent store.
    ///
    /// The callback stays registered for as long as the returned guard is
    /// alive.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription::new(move || drop(callback))
    }

    /// Number of subscribers whose guards are still alive.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn store(&self, value: T) {
        let mut inner = self.inner.borrow_mut();
        inner.value = value;
        inner.version += 1;
    }

    fn notify(&self) {
        let (value, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            (inner.value.clone(), inner.subscribers.clone())
        };
        for weak in subscribers {
            // Upgrade lazily: a guard dropped by an earlier callback in this
            // cycle must not fire.
            if let Some(callback) = weak.upgrade() {
                callback(&value);
            }
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Store `value` if it differs from the current one.
    ///
    /// Returns whether the value changed (and subscribers were notified).
    pub fn set(&self, value: T) -> bool {
        if self.inner.borrow().value == value {
            return false;
        }
        self.replace(value);
        true
    }
}
