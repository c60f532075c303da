#![forbid(unsafe_code)]

//! RAII subscription guards.
//!
//! # Invariants
//!
//! 1. The teardown closure of a [`Subscription`] runs at most once, either on
//!    the first call to [`Subscription::unsubscribe`] or on drop.
//! 2. Calling `unsubscribe` again is a no-op.
//! 3. A [`Liveness`] flag guarded by [`Liveness::guard`] reads `false` before
//!    the wrapped teardown runs, so a listener that checks it can never act
//!    after teardown began.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// RAII guard for a registered listener.
///
/// Dropping the guard removes the listener. A guard can also be torn down
/// early with [`unsubscribe`](Self::unsubscribe).
#[must_use = "dropping a Subscription immediately removes the listener"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Create a guard that runs `teardown` exactly once.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        crate::trace!("subscription created");
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A guard that owns nothing. Useful as a placeholder before binding.
    pub fn inert() -> Self {
        Self { teardown: None }
    }

    /// Whether the teardown has not yet run.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    /// Run the teardown now. Safe to call any number of times.
    pub fn unsubscribe(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            crate::trace!("subscription torn down");
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Shared liveness flag checked by a listener before it acts.
///
/// Cloning yields another handle to the same flag.
#[derive(Clone)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    /// A new flag, initially live.
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.0.get()
    }

    /// Mark the flag dead. Idempotent.
    pub fn kill(&self) {
        self.0.set(false);
    }

    /// Wrap `inner` so the flag is killed before `inner` tears down.
    pub fn guard(self, mut inner: Subscription) -> Subscription {
        Subscription::new(move || {
            self.kill();
            inner.unsubscribe();
        })
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Liveness").field(&self.is_live()).finish()
    }
}
