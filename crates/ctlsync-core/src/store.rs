#![forbid(unsafe_code)]

//! Reference in-memory controller.
//!
//! [`Store`] holds a state snapshot behind an `Rc` and two listener
//! registries: one for state changes, one per event name. It implements
//! [`Controller`] with the dispatch rules the bridge relies on.
//!
//! # Dispatch
//!
//! - The listener list is snapshotted before dispatch. A listener added
//!   during a dispatch is not called for it.
//! - Each entry carries a [`Liveness`] flag checked right before it is
//!   called, so a listener removed mid-dispatch is skipped.
//! - No `RefCell` borrow is held while listeners run. Listeners may read
//!   state, mutate the store, and (un)register re-entrantly.
//! - A state listener receives the snapshot taken when its dispatch began.
//!   Under nested mutation a later listener may therefore receive a state
//!   that is no longer current; consumers that need convergence re-read
//!   [`Controller::state`].
//!
//! Every `set_state` notifies, even if the new state equals the old one.
//! Deduplication is the subscriber's job.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::controller::{Controller, EventListener, EventName, StateListener};
use crate::payload::Payload;
use crate::subscription::{Liveness, Subscription};

struct Entry<L> {
    id: u64,
    live: Liveness,
    listener: L,
}

struct Registry<L> {
    entries: Vec<Rc<Entry<L>>>,
}

impl<L> Registry<L> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, id: u64, listener: L) -> Rc<Entry<L>> {
        let entry = Rc::new(Entry {
            id,
            live: Liveness::new(),
            listener,
        });
        self.entries.push(Rc::clone(&entry));
        entry
    }

    /// Removed entries are returned so they drop after the borrow ends.
    fn remove(&mut self, id: u64) -> Option<Rc<Entry<L>>> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    fn snapshot(&self) -> Vec<Rc<Entry<L>>> {
        self.entries.clone()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

type EventRegistries<V> = HashMap<EventName, Registry<EventListener<V>>>;

/// An in-memory controller with replaceable state and named events.
///
/// `S` is the state type, `V` the type of each event argument.
pub struct Store<S, V = ()> {
    state: RefCell<Rc<S>>,
    state_listeners: Rc<RefCell<Registry<StateListener<S>>>>,
    event_listeners: Rc<RefCell<EventRegistries<V>>>,
    next_id: Cell<u64>,
}

impl<S: 'static, V: Clone + 'static> Store<S, V> {
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            state: RefCell::new(Rc::new(initial)),
            state_listeners: Rc::new(RefCell::new(Registry::new())),
            event_listeners: Rc::new(RefCell::new(HashMap::new())),
            next_id: Cell::new(0),
        }
    }

    /// A store behind an `Rc`, ready to be shared between components.
    #[must_use]
    pub fn shared(initial: S) -> Rc<Self> {
        Rc::new(Self::new(initial))
    }

    /// Replace the state and notify every state listener.
    pub fn set_state(&self, next: S) {
        *self.state.borrow_mut() = Rc::new(next);
        self.notify();
    }

    /// Derive the next state from the current one.
    pub fn update(&self, f: impl FnOnce(&S) -> S) {
        let current = self.state();
        self.set_state(f(&current));
    }

    /// Clone the current state, mutate the clone, and store it.
    pub fn patch(&self, f: impl FnOnce(&mut S))
    where
        S: Clone,
    {
        let mut next = S::clone(&self.state());
        f(&mut next);
        self.set_state(next);
    }

    /// Fire `event` with `payload` to every listener registered for it.
    pub fn emit(&self, event: impl Into<EventName>, payload: impl Into<Payload<V>>) {
        let event = event.into();
        let payload = payload.into();
        let snapshot = self
            .event_listeners
            .borrow()
            .get(&event)
            .map(Registry::snapshot)
            .unwrap_or_default();
        crate::trace!(event = %event, listeners = snapshot.len(), arity = payload.len(), "emit");
        for entry in snapshot {
            if entry.live.is_live() {
                (entry.listener)(&payload);
            }
        }
    }

    /// Number of registered state listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state_listeners.borrow().len()
    }

    /// Number of listeners registered for `event`.
    #[must_use]
    pub fn event_listener_count(&self, event: &str) -> usize {
        self.event_listeners.borrow().get(event).map_or(0, Registry::len)
    }

    fn notify(&self) {
        let state = self.state();
        let snapshot = self.state_listeners.borrow().snapshot();
        crate::trace!(listeners = snapshot.len(), "dispatching state change");
        for entry in snapshot {
            if entry.live.is_live() {
                (entry.listener)(&state);
            }
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl<S: 'static, V: Clone + 'static> Controller for Store<S, V> {
    type State = S;
    type Value = V;

    fn state(&self) -> Rc<S> {
        Rc::clone(&self.state.borrow())
    }

    fn on_state_change(&self, listener: StateListener<S>) -> Subscription {
        let id = self.next_id();
        let entry = self.state_listeners.borrow_mut().insert(id, listener);
        let registry = Rc::downgrade(&self.state_listeners);
        Subscription::new(move || {
            entry.live.kill();
            if let Some(registry) = registry.upgrade() {
                let removed = registry.borrow_mut().remove(id);
                drop(removed);
            }
        })
    }

    fn on_event(&self, event: &EventName, listener: EventListener<V>) -> Subscription {
        let id = self.next_id();
        let entry = self
            .event_listeners
            .borrow_mut()
            .entry(event.clone())
            .or_insert_with(Registry::new)
            .insert(id, listener);
        let registries = Rc::downgrade(&self.event_listeners);
        let event = event.clone();
        Subscription::new(move || {
            entry.live.kill();
            if let Some(registries) = registries.upgrade() {
                let removed = {
                    let mut map = registries.borrow_mut();
                    let removed = map.get_mut(&event).and_then(|r| r.remove(id));
                    if map.get(&event).is_some_and(|r| r.len() == 0) {
                        map.remove(&event);
                    }
                    removed
                };
                drop(removed);
            }
        })
    }
}

impl<S: fmt::Debug, V> fmt::Debug for Store<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state.borrow())
            .field("state_listeners", &self.state_listeners.borrow().len())
            .field("events", &self.event_listeners.borrow().len())
            .finish()
    }
}
