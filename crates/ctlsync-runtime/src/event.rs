#![forbid(unsafe_code)]

//! Event subscriptions: keep the latest payload of a named controller event.
//!
//! # Design
//!
//! An [`EventSubscription`] registers one listener for one event name. Each
//! occurrence:
//!
//! 1. runs the optional [`Reaction`] synchronously with the payload, then
//! 2. replaces the payload buffer wholesale and notifies observers.
//!
//! Reactions run before the payload becomes visible, which lets a consumer
//! react in the same dispatch, for example clearing another subscription's
//! buffer when a "cancel-all" event fires.
//!
//! The buffer is `None` until the first occurrence and after a clear. A
//! [`ClearHandle`] is a detachable, clonable way to clear it; once the
//! subscription is gone, clearing through a stale handle does nothing.
//!
//! # Invariants
//!
//! 1. Every occurrence notifies observers, even if its payload equals the
//!    buffered one.
//! 2. Clearing an empty buffer does not notify.
//! 3. Subscriptions on the same event are independent; each owns its buffer.
//! 4. After teardown, occurrences neither run the reaction nor touch the
//!    buffer.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ctlsync_core::{Controller, EventListener, EventName, Liveness, Payload, Subscription};
use ctlsync_core::{debug, trace};

use crate::reactive::Observable;

/// Synchronous callback run when the event fires, before the payload is
/// stored.
pub type Reaction<V> = Rc<dyn Fn(&Payload<V>)>;

struct EventState<V> {
    buffer: Observable<Option<Payload<V>>>,
    reaction: RefCell<Option<Reaction<V>>>,
}

impl<V: Clone + 'static> EventState<V> {
    fn clear(&self) -> bool {
        if self.buffer.with(Option::is_none) {
            return false;
        }
        self.buffer.replace(None);
        true
    }
}

/// Clears an event subscription's payload buffer.
pub struct ClearHandle<V> {
    state: Weak<EventState<V>>,
}

impl<V> Clone for ClearHandle<V> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}

impl<V> fmt::Debug for ClearHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClearHandle")
            .field("attached", &(self.state.strong_count() > 0))
            .finish()
    }
}

impl<V: Clone + 'static> ClearHandle<V> {
    /// Empty the buffer.
    ///
    /// Returns `true` if a payload was removed (and observers notified).
    pub fn clear(&self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        let cleared = state.clear();
        if cleared {
            trace!("event payload cleared");
        }
        cleared
    }

    /// Whether the subscription this handle clears still exists.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.strong_count() > 0
    }
}

fn bind<C: Controller>(
    controller: &Rc<C>,
    event: &EventName,
    state: &Rc<EventState<C::Value>>,
) -> Subscription {
    let live = Liveness::new();
    let listener_live = live.clone();
    let weak_state = Rc::downgrade(state);

    let listener: EventListener<C::Value> = Rc::new(move |payload: &Payload<C::Value>| {
        if !listener_live.is_live() {
            return;
        }
        let Some(state) = weak_state.upgrade() else {
            return;
        };
        let reaction = state.reaction.borrow().clone();
        if let Some(reaction) = reaction {
            reaction(payload);
            // The reaction may have torn this subscription down.
            if !listener_live.is_live() {
                return;
            }
        }
        state.buffer.replace(Some(payload.clone()));
    });

    trace!(event = %event, "event subscription bound");
    live.guard(controller.on_event(event, listener))
}

/// The latest payload of one named event on one controller.
///
/// Dropping the subscription removes its controller listener.
pub struct EventSubscription<C: Controller> {
    controller: Rc<C>,
    event: EventName,
    state: Rc<EventState<C::Value>>,
    handle: Subscription,
}

impl<C: Controller> EventSubscription<C> {
    /// Subscribe to `event`. The buffer starts empty.
    pub fn new(controller: &Rc<C>, event: impl Into<EventName>) -> Self {
        let event = event.into();
        let state = Rc::new(EventState {
            buffer: Observable::new(None),
            reaction: RefCell::new(None),
        });
        let handle = bind(controller, &event, &state);
        Self {
            controller: Rc::clone(controller),
            event,
            state,
            handle,
        }
    }

    /// Builder form of [`set_reaction`](Self::set_reaction).
    #[must_use]
    pub fn with_reaction(self, reaction: impl Fn(&Payload<C::Value>) + 'static) -> Self {
        self.set_reaction(Some(Rc::new(reaction)));
        self
    }

    /// Replace (or remove) the reaction run on each occurrence.
    pub fn set_reaction(&self, reaction: Option<Reaction<C::Value>>) {
        *self.state.reaction.borrow_mut() = reaction;
    }

    /// The most recent payload, or `None` if empty.
    #[must_use]
    pub fn payload(&self) -> Option<Payload<C::Value>> {
        self.state.buffer.get()
    }

    pub fn with_payload<R>(&self, f: impl FnOnce(Option<&Payload<C::Value>>) -> R) -> R {
        self.state.buffer.with(|buffer| f(buffer.as_ref()))
    }

    #[must_use]
    pub fn clear_handle(&self) -> ClearHandle<C::Value> {
        ClearHandle {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Empty the buffer. See [`ClearHandle::clear`].
    pub fn clear(&self) -> bool {
        self.clear_handle().clear()
    }

    /// Number of buffer writes (occurrences and effective clears).
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.buffer.version()
    }

    /// Call `observer` after every buffer write.
    pub fn observe(
        &self,
        observer: impl Fn(Option<&Payload<C::Value>>) + 'static,
    ) -> Subscription {
        self.state
            .buffer
            .subscribe(move |buffer| observer(buffer.as_ref()))
    }

    #[must_use]
    pub fn event(&self) -> &EventName {
        &self.event
    }

    #[must_use]
    pub fn controller(&self) -> &Rc<C> {
        &self.controller
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.handle.is_active()
    }

    /// Tear the controller listener down early. Idempotent.
    pub fn unsubscribe(&mut self) {
        self.handle.unsubscribe();
    }

    /// Per-render update.
    ///
    /// Re-subscribes if the controller instance or the event name changed,
    /// installs `reaction` as the current reaction, and returns the buffered
    /// payload with a clear handle. A new controller keeps the buffer; a new
    /// event name empties it without notifying observers.
    pub fn sync(
        &mut self,
        controller: &Rc<C>,
        event: impl Into<EventName>,
        reaction: Option<Reaction<C::Value>>,
    ) -> (Option<Payload<C::Value>>, ClearHandle<C::Value>) {
        let event = event.into();
        if !Rc::ptr_eq(&self.controller, controller) || event != self.event {
            debug!(from = %self.event, to = %event, "event binding changed; re-subscribing");
            if event != self.event {
                // A payload of the old event is not an occurrence of the new one.
                self.state.buffer.replace_quiet(None);
            }
            self.handle.unsubscribe();
            self.controller = Rc::clone(controller);
            self.event = event;
            self.handle = bind(&self.controller, &self.event, &self.state);
        }
        self.set_reaction(reaction);
        (self.payload(), self.clear_handle())
    }
}

impl<C: Controller> fmt::Debug for EventSubscription<C>
where
    C::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("event", &self.event)
            .field("payload", &self.state.buffer)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}
