#![forbid(unsafe_code)]

//! The controller contract.
//!
//! A controller is shared (`Rc<C>`) by every component that observes it and
//! outlives all of them. The bridge only reads its state and registers
//! listeners; it never mutates it.
//!
//! # Invariants implementors must uphold
//!
//! 1. [`Controller::state`] returns a consistent snapshot. Two reads with no
//!    mutation in between return equal snapshots.
//! 2. Every listener registered when a change happens observes it exactly
//!    once. A listener registered during a dispatch does not observe that
//!    dispatch.
//! 3. Once the returned [`Subscription`] is torn down the listener is never
//!    invoked again.
//! 4. No internal borrow is held while listeners run, so listeners may read
//!    state, register, or unregister re-entrantly.

use std::borrow::{Borrow, Cow};
use std::fmt;
use std::rc::Rc;

use crate::payload::Payload;
use crate::subscription::Subscription;

/// Listener for state-change notifications. Receives the new state.
pub type StateListener<S> = Rc<dyn Fn(&S)>;

/// Listener for a named event. Receives the positional payload.
pub type EventListener<V> = Rc<dyn Fn(&Payload<V>)>;

/// An external stateful, event-emitting object observed by the bridge.
pub trait Controller: 'static {
    /// The state snapshot type.
    type State: 'static;
    /// The type of each positional event argument.
    type Value: Clone + 'static;

    /// Current state snapshot.
    fn state(&self) -> Rc<Self::State>;

    /// Register `listener` for every state mutation.
    fn on_state_change(&self, listener: StateListener<Self::State>) -> Subscription;

    /// Register `listener` for every occurrence of `event`.
    fn on_event(&self, event: &EventName, listener: EventListener<Self::Value>) -> Subscription;
}

/// Name of a controller event, e.g. `"upload-success"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventName(Cow<'static, str>);

impl EventName {
    /// Name from a static string, usable in `const` contexts.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for EventName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&EventName> for EventName {
    fn from(name: &EventName) -> Self {
        name.clone()
    }
}

impl Borrow<str> for EventName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
