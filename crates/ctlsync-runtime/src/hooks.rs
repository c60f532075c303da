#![forbid(unsafe_code)]

//! Component host: positional per-component state for the bridge primitives.
//!
//! A [`Component`] owns one slot per hook call. The first render creates the
//! subscriptions; later renders find them again by call position and sync
//! them with that render's arguments. Every subscription's changes are wired
//! to the component's [`RenderRequest`], so the host learns that a render is
//! needed without the bridge ever rendering on its own.
//!
//! Unmounting (or dropping) the component drops every slot, which tears
//! every subscription down exactly once.
//!
//! # Panics
//!
//! Hooks must be called in the same order, with the same kinds and types, on
//! every render. A mismatch is a bug in the component and panics.
//!
//! # Example
//!
//! ```
//! use ctlsync_core::Store;
//! use ctlsync_runtime::Component;
//!
//! #[derive(Clone)]
//! struct Uploads {
//!     count: u32,
//! }
//!
//! let store = Store::<Uploads>::shared(Uploads { count: 0 });
//! let mut component = Component::new();
//!
//! let count = component.render(|hooks| hooks.use_selector(&store, |s| s.count));
//! assert_eq!(count, 0);
//!
//! store.patch(|s| s.count = 1);
//! assert!(component.is_dirty());
//!
//! let count = component.render(|hooks| hooks.use_selector(&store, |s| s.count));
//! assert_eq!(count, 1);
//! ```

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use ctlsync_core::{Controller, EventName, Payload, SelectorError, Subscription};
use ctlsync_core::{trace, warn};

use crate::event::{ClearHandle, EventSubscription, Reaction};
use crate::reactive::RenderRequest;
use crate::select::{Equality, SelectorSubscription};

// Field order matters: the subscription drops before its render observer.
struct SelectorSlot<C: Controller, P> {
    subscription: SelectorSubscription<C, P>,
    _observer: Subscription,
}

struct EventSlot<C: Controller> {
    subscription: EventSubscription<C>,
    _observer: Subscription,
}

/// Host-side state of one mounted component.
pub struct Component {
    slots: Vec<Box<dyn Any>>,
    render: RenderRequest,
    renders: u64,
    mounted: bool,
}

impl Component {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            render: RenderRequest::new(),
            renders: 0,
            mounted: false,
        }
    }

    /// Run one render pass.
    ///
    /// Clears the dirty flag, then runs `view` with a [`Hooks`] handle. The
    /// first pass after construction or [`unmount`](Self::unmount) mounts:
    /// it creates subscriptions. Later passes reuse them. A mounting pass
    /// that panicked is retried from scratch by the next render.
    ///
    /// # Panics
    ///
    /// Panics if a later pass calls a different number of hooks than the
    /// mounting pass did.
    pub fn render<R>(&mut self, view: impl FnOnce(&mut Hooks<'_>) -> R) -> R {
        self.render.take();
        self.renders += 1;
        let mounting = !self.mounted;
        if mounting && !self.slots.is_empty() {
            // Left behind by a mounting pass that unwound.
            warn!(stale = self.slots.len(), "discarding hooks of an interrupted mount");
            self.slots.clear();
        }
        let mut hooks = Hooks {
            slots: &mut self.slots,
            render: &self.render,
            cursor: 0,
            mounting,
        };
        let out = view(&mut hooks);
        let used = hooks.cursor;

        if !mounting && used != self.slots.len() {
            warn!(used, expected = self.slots.len(), "hook count changed between renders");
            panic!(
                "render called {used} hooks but the mounting render called {}; \
                 hooks must run unconditionally and in the same order",
                self.slots.len()
            );
        }
        self.mounted = true;
        trace!(renders = self.renders, hooks = used, "component rendered");
        out
    }

    /// Drop every subscription. The next render mounts afresh.
    pub fn unmount(&mut self) {
        trace!(hooks = self.slots.len(), "component unmounted");
        self.slots.clear();
        self.mounted = false;
        self.render.take();
    }

    /// Whether a subscription changed since the last render.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.render.is_dirty()
    }

    /// Total render requests made by this component's subscriptions.
    #[must_use]
    pub fn render_requests(&self) -> u64 {
        self.render.count()
    }

    /// Number of completed or attempted render passes.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for Component {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("hooks", &self.slots.len())
            .field("renders", &self.renders)
            .field("mounted", &self.mounted)
            .field("render", &self.render)
            .finish()
    }
}

/// Hook calls available during one render pass.
pub struct Hooks<'a> {
    slots: &'a mut Vec<Box<dyn Any>>,
    render: &'a RenderRequest,
    cursor: usize,
    mounting: bool,
}

impl Hooks<'_> {
    /// Project controller state; re-render when the projection changes.
    pub fn use_selector<C, P>(
        &mut self,
        controller: &Rc<C>,
        selector: impl Fn(&C::State) -> P + 'static,
    ) -> P
    where
        C: Controller,
        P: Clone + PartialEq + 'static,
    {
        self.use_selector_with(controller, selector, Equality::value())
    }

    /// [`use_selector`](Self::use_selector) with an explicit equality policy.
    ///
    /// The policy is taken from the mounting render; later values are
    /// ignored.
    pub fn use_selector_with<C, P>(
        &mut self,
        controller: &Rc<C>,
        selector: impl Fn(&C::State) -> P + 'static,
        equality: Equality<P>,
    ) -> P
    where
        C: Controller,
        P: Clone + 'static,
    {
        let index = self.next_index();
        if index == self.slots.len() {
            let subscription = SelectorSubscription::with_equality(controller, selector, equality);
            let render = self.render.clone();
            let observer = subscription.observe(move |_| render.request());
            let projection = subscription.get();
            self.slots.push(Box::new(SelectorSlot {
                subscription,
                _observer: observer,
            }));
            return projection;
        }
        self.existing::<SelectorSlot<C, P>>(index)
            .subscription
            .sync(controller, selector)
    }

    /// Fallible projection. Errors reach the caller on every render until a
    /// later state projects successfully.
    ///
    /// # Errors
    ///
    /// Returns the selector's latest error, wrapped in [`SelectorError`].
    pub fn try_use_selector<C, T, E>(
        &mut self,
        controller: &Rc<C>,
        selector: impl Fn(&C::State) -> Result<T, E> + 'static,
    ) -> Result<T, SelectorError>
    where
        C: Controller,
        T: Clone + PartialEq + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.use_selector_with(
            controller,
            move |state| selector(state).map_err(SelectorError::new),
            Equality::result(),
        )
    }

    /// Latest payload of `event`, and a handle to clear it.
    pub fn use_event<C: Controller>(
        &mut self,
        controller: &Rc<C>,
        event: impl Into<EventName>,
    ) -> (Option<Payload<C::Value>>, ClearHandle<C::Value>) {
        self.event_slot(controller, event.into(), None)
    }

    /// [`use_event`](Self::use_event) with a reaction run synchronously on
    /// every occurrence, before the payload is stored.
    pub fn use_event_with_reaction<C: Controller>(
        &mut self,
        controller: &Rc<C>,
        event: impl Into<EventName>,
        reaction: impl Fn(&Payload<C::Value>) + 'static,
    ) -> (Option<Payload<C::Value>>, ClearHandle<C::Value>) {
        let reaction: Reaction<C::Value> = Rc::new(reaction);
        self.event_slot(controller, event.into(), Some(reaction))
    }

    fn event_slot<C: Controller>(
        &mut self,
        controller: &Rc<C>,
        event: EventName,
        reaction: Option<Reaction<C::Value>>,
    ) -> (Option<Payload<C::Value>>, ClearHandle<C::Value>) {
        let index = self.next_index();
        if index == self.slots.len() {
            let subscription = EventSubscription::new(controller, event);
            subscription.set_reaction(reaction);
            let render = self.render.clone();
            let observer = subscription.observe(move |_| render.request());
            let out = (subscription.payload(), subscription.clear_handle());
            self.slots.push(Box::new(EventSlot {
                subscription,
                _observer: observer,
            }));
            return out;
        }
        self.existing::<EventSlot<C>>(index)
            .subscription
            .sync(controller, event, reaction)
    }

    fn next_index(&mut self) -> usize {
        let index = self.cursor;
        self.cursor += 1;
        if index >= self.slots.len() && !self.mounting {
            warn!(index, "hook called that the mounting render did not call");
            panic!(
                "hook #{index} was not called by the mounting render; \
                 hooks must run unconditionally and in the same order"
            );
        }
        index
    }

    fn existing<T: 'static>(&mut self, index: usize) -> &mut T {
        match self.slots[index].downcast_mut::<T>() {
            Some(slot) => slot,
            None => {
                warn!(index, "hook kind changed between renders");
                panic!(
                    "hook #{index} changed kind or type between renders; \
                     hooks must run unconditionally and in the same order"
                );
            }
        }
    }
}

impl fmt::Debug for Hooks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("cursor", &self.cursor)
            .field("mounting", &self.mounting)
            .finish()
    }
}
