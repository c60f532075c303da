#![forbid(unsafe_code)]

//! Selector subscriptions: project controller state, notify on change.
//!
//! # Design
//!
//! A [`SelectorSubscription`] registers one state-change listener on its
//! controller. Each notification re-reads the controller's *current* state,
//! runs the selector, and compares the result with the cached projection
//! under an [`Equality`] policy. Only a changed projection is written to the
//! cell, so observers (typically a component's [`RenderRequest`]) hear about
//! changes and nothing else.
//!
//! [`RenderRequest`]: crate::reactive::RenderRequest
//!
//! # Invariants
//!
//! 1. When a notification completes, the cache equals
//!    `selector(controller.state())` under the equality policy.
//! 2. Observers are notified iff the projection changed.
//! 3. Exactly one controller listener is live per subscription. A controller
//!    identity change tears the old listener down before the new one is
//!    registered.
//! 4. After teardown no notification touches the cache.
//!
//! # Failure Modes
//!
//! - **Selector panics**: the panic unwinds through whatever triggered the
//!   evaluation, either the controller mutation or the render. The cache keeps
//!   its last value.
//! - **Fallible selector**: project into `Result<T, SelectorError>` and use
//!   [`Equality::result`]. An `Err` always counts as a change, so the render
//!   boundary sees every failure.
//! - **Controller dropped mid-dispatch**: the listener falls back to the
//!   dispatched state.
//!
//! # Equality
//!
//! The default policy is value equality (`PartialEq`). Selectors that build
//! a fresh composite on every call are compared structurally; for `Rc`
//! projections [`Equality::pointer`] gives identity semantics instead, and
//! then every freshly allocated projection counts as a change.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ctlsync_core::{Controller, Liveness, SelectorError, StateListener, Subscription};
use ctlsync_core::{debug, trace};

use crate::reactive::Observable;

type Selector<S, P> = Rc<dyn Fn(&S) -> P>;

/// Policy deciding whether two projections are the same.
pub struct Equality<P> {
    eq: Rc<dyn Fn(&P, &P) -> bool>,
}

impl<P> Clone for Equality<P> {
    fn clone(&self) -> Self {
        Self {
            eq: Rc::clone(&self.eq),
        }
    }
}

impl<P> fmt::Debug for Equality<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Equality(..)")
    }
}

impl<P: 'static> Equality<P> {
    /// `eq` returns `true` when two projections count as the same.
    pub fn custom(eq: impl Fn(&P, &P) -> bool + 'static) -> Self {
        Self { eq: Rc::new(eq) }
    }

    /// Every projection is a change.
    #[must_use]
    pub fn never() -> Self {
        Self::custom(|_, _| false)
    }

    #[must_use]
    pub fn same(&self, a: &P, b: &P) -> bool {
        (self.eq)(a, b)
    }
}

impl<P: PartialEq + 'static> Equality<P> {
    /// `PartialEq` comparison.
    #[must_use]
    pub fn value() -> Self {
        Self::custom(|a, b| a == b)
    }
}

impl<T: ?Sized + 'static> Equality<Rc<T>> {
    /// Identity comparison of shared projections.
    #[must_use]
    pub fn pointer() -> Self {
        Self::custom(|a, b| Rc::ptr_eq(a, b))
    }
}

impl<T: PartialEq + 'static> Equality<Result<T, SelectorError>> {
    /// Value comparison of successes; errors never compare equal.
    #[must_use]
    pub fn result() -> Self {
        Self::custom(|a, b| matches!((a, b), (Ok(a), Ok(b)) if a == b))
    }
}

impl<P: PartialEq + 'static> Default for Equality<P> {
    fn default() -> Self {
        Self::value()
    }
}

struct SelectState<S, P> {
    selector: RefCell<Selector<S, P>>,
    equality: Equality<P>,
    cell: Observable<P>,
}

impl<S: 'static, P: Clone + 'static> SelectState<S, P> {
    fn project(&self, state: &S) -> P {
        let selector = Rc::clone(&self.selector.borrow());
        selector(state)
    }

    fn unchanged(&self, next: &P) -> bool {
        self.cell.with(|current| self.equality.same(current, next))
    }

    /// Recompute and notify observers if the projection changed.
    fn refresh(&self, state: &S) -> bool {
        let next = self.project(state);
        if self.unchanged(&next) {
            return false;
        }
        self.cell.replace(next);
        true
    }
}

fn bind<C, P>(controller: &Rc<C>, state: &Rc<SelectState<C::State, P>>) -> Subscription
where
    C: Controller,
    P: Clone + 'static,
{
    let live = Liveness::new();
    let listener_live = live.clone();
    let weak_state = Rc::downgrade(state);
    let weak_controller = Rc::downgrade(controller);

    let listener: StateListener<C::State> = Rc::new(move |dispatched: &C::State| {
        if !listener_live.is_live() {
            return;
        }
        let Some(state) = weak_state.upgrade() else {
            return;
        };
        // Read the latest snapshot, not the dispatched one: under nested
        // mutation the dispatched state may already be stale.
        let changed = match weak_controller.upgrade() {
            Some(controller) => state.refresh(&controller.state()),
            None => state.refresh(dispatched),
        };
        if changed {
            trace!("selector projection changed");
        }
    });

    live.guard(controller.on_state_change(listener))
}

/// A live projection of a controller's state.
///
/// Dropping the subscription removes its controller listener.
pub struct SelectorSubscription<C: Controller, P> {
    controller: Rc<C>,
    state: Rc<SelectState<C::State, P>>,
    handle: Subscription,
}

impl<C: Controller, P: Clone + 'static> SelectorSubscription<C, P> {
    /// Subscribe with value equality.
    pub fn new(controller: &Rc<C>, selector: impl Fn(&C::State) -> P + 'static) -> Self
    where
        P: PartialEq,
    {
        Self::with_equality(controller, selector, Equality::value())
    }

    /// Subscribe with an explicit equality policy.
    ///
    /// The initial projection is read immediately.
    pub fn with_equality(
        controller: &Rc<C>,
        selector: impl Fn(&C::State) -> P + 'static,
        equality: Equality<P>,
    ) -> Self {
        let selector: Selector<C::State, P> = Rc::new(selector);
        let initial = selector(&controller.state());
        let state = Rc::new(SelectState {
            selector: RefCell::new(selector),
            equality,
            cell: Observable::new(initial),
        });
        let handle = bind(controller, &state);
        trace!("selector subscription created");
        Self {
            controller: Rc::clone(controller),
            state,
            handle,
        }
    }

    /// The cached projection.
    #[must_use]
    pub fn get(&self) -> P {
        self.state.cell.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&P) -> R) -> R {
        self.state.cell.with(f)
    }

    /// Number of projections stored since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.cell.version()
    }

    /// Call `observer` with every changed projection.
    pub fn observe(&self, observer: impl Fn(&P) + 'static) -> Subscription {
        self.state.cell.subscribe(observer)
    }

    #[must_use]
    pub fn controller(&self) -> &Rc<C> {
        &self.controller
    }

    /// Whether the controller listener is still registered.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.handle.is_active()
    }

    /// Per-render update.
    ///
    /// Re-subscribes only if `controller` is a different instance, installs
    /// `selector` as the current selector, and re-reads the projection from
    /// the controller's current state. The cache is updated without notifying
    /// observers since the caller is the one rendering.
    pub fn sync(&mut self, controller: &Rc<C>, selector: impl Fn(&C::State) -> P + 'static) -> P {
        *self.state.selector.borrow_mut() = Rc::new(selector);
        self.resubscribe(controller);
        let next = self.state.project(&self.controller.state());
        if !self.state.unchanged(&next) {
            self.state.cell.replace_quiet(next);
        }
        self.get()
    }

    /// Point the subscription at `controller` and re-project from its
    /// current state, notifying observers if the projection changed.
    ///
    /// Returns `false` (and does nothing) if it is the current instance.
    pub fn rebind(&mut self, controller: &Rc<C>) -> bool {
        if !self.resubscribe(controller) {
            return false;
        }
        self.state.refresh(&self.controller.state());
        true
    }

    fn resubscribe(&mut self, controller: &Rc<C>) -> bool {
        if Rc::ptr_eq(&self.controller, controller) {
            return false;
        }
        debug!("controller instance changed; re-subscribing selector");
        self.handle.unsubscribe();
        self.controller = Rc::clone(controller);
        self.handle = bind(&self.controller, &self.state);
        true
    }

    /// Tear the controller listener down early. Idempotent.
    pub fn unsubscribe(&mut self) {
        self.handle.unsubscribe();
    }
}

impl<C: Controller, P: fmt::Debug + Clone + 'static> fmt::Debug for SelectorSubscription<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorSubscription")
            .field("projection", &self.state.cell)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctlsync_core::Store;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Uploads {
        count: u32,
        names: Vec<&'static str>,
        paused: bool,
    }

    fn uploads() -> Rc<Store<Uploads>> {
        Store::shared(Uploads {
            count: 0,
            names: Vec::new(),
            paused: false,
        })
    }

    fn hits<P: Clone + 'static, C: Controller>(
        sub: &SelectorSubscription<C, P>,
    ) -> (Rc<Cell<u32>>, Subscription) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let guard = sub.observe(move |_| h.set(h.get() + 1));
        (hits, guard)
    }

    #[test]
    fn initial_projection_is_read_eagerly() {
        let store = uploads();
        let sub = SelectorSubscription::new(&store, |s| s.count);
        assert_eq!(sub.get(), 0);
        assert_eq!(sub.version(), 0);
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn notifies_only_when_projection_changes() {
        let store = uploads();
        let sub = SelectorSubscription::new(&store, |s| s.count);
        let (hits, _guard) = hits(&sub);

        store.patch(|s| s.paused = true);
        assert_eq!(hits.get(), 0);

        store.patch(|s| s.count = 3);
        assert_eq!(sub.get(), 3);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn composite_projections_compare_by_value() {
        let store = uploads();
        let sub = SelectorSubscription::new(&store, |s| s.names.clone());
        let (hits, _guard) = hits(&sub);

        store.patch(|s| s.count = 9);
        assert_eq!(hits.get(), 0);

        store.patch(|s| s.names.push("a.png"));
        assert_eq!(sub.get(), vec!["a.png"]);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn never_equality_treats_every_notification_as_change() {
        let store = uploads();
        let sub = SelectorSubscription::with_equality(&store, |s| s.count, Equality::never());
        let (hits, _guard) = hits(&sub);
        store.patch(|s| s.paused = true);
        store.patch(|s| s.paused = false);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn pointer_equality_sees_fresh_allocations_as_changes() {
        let store = uploads();
        let shared = Rc::new(7u32);
        let stable = Rc::clone(&shared);
        let same = SelectorSubscription::with_equality(
            &store,
            move |_| Rc::clone(&stable),
            Equality::pointer(),
        );
        let fresh =
            SelectorSubscription::with_equality(&store, |s| Rc::new(s.count), Equality::pointer());
        let (same_hits, _g1) = hits(&same);
        let (fresh_hits, _g2) = hits(&fresh);

        store.patch(|s| s.paused = true);
        assert_eq!(same_hits.get(), 0);
        assert_eq!(fresh_hits.get(), 1);
        assert!(Rc::ptr_eq(&same.get(), &shared));
    }

    #[test]
    fn fallible_selector_surfaces_errors_as_changes() {
        let store = uploads();
        let sub = SelectorSubscription::with_equality(
            &store,
            |s| {
                s.names
                    .first()
                    .copied()
                    .ok_or_else(|| SelectorError::msg("no files"))
            },
            Equality::result(),
        );
        let (hits, _guard) = hits(&sub);
        assert!(sub.get().is_err());

        store.patch(|s| s.paused = true);
        assert_eq!(hits.get(), 1, "a repeated error is still a change");

        store.patch(|s| s.names.push("b.txt"));
        assert_eq!(sub.get().ok(), Some("b.txt"));
        store.patch(|s| s.count = 1);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn converges_under_nested_mutation() {
        let store = uploads();
        let weak = Rc::downgrade(&store);
        // Registered first: bumps count again while the outer dispatch is
        // still delivering the first change.
        let _bump = store.on_state_change(Rc::new(move |s: &Uploads| {
            if s.count == 1 {
                if let Some(store) = weak.upgrade() {
                    store.patch(|s| s.count = 2);
                }
            }
        }));
        let sub = SelectorSubscription::new(&store, |s| s.count);
        let (hits, _guard) = hits(&sub);

        store.patch(|s| s.count = 1);

        assert_eq!(sub.get(), 2);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn drop_removes_listener_and_freezes_cache() {
        let store = uploads();
        let mut sub = SelectorSubscription::new(&store, |s| s.count);
        let (hits, _guard) = hits(&sub);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_subscribed());
        assert_eq!(store.listener_count(), 0);

        store.patch(|s| s.count = 5);
        assert_eq!(sub.get(), 0);
        assert_eq!(hits.get(), 0);

        drop(sub);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn sync_with_same_controller_keeps_handle() {
        let store = uploads();
        let mut sub = SelectorSubscription::new(&store, |s| s.count);
        let (hits, _guard) = hits(&sub);

        for _ in 0..5 {
            assert_eq!(sub.sync(&store, |s| s.count), 0);
        }
        assert_eq!(store.listener_count(), 1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn sync_installs_latest_selector_quietly() {
        let store = uploads();
        store.patch(|s| s.count = 4);
        let mut sub = SelectorSubscription::new(&store, |s| s.count);
        let (hits, _guard) = hits(&sub);

        let factor = 10;
        assert_eq!(sub.sync(&store, move |s| s.count * factor), 40);
        assert_eq!(hits.get(), 0);

        store.patch(|s| s.count = 5);
        assert_eq!(sub.get(), 50);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn controller_change_resubscribes() {
        let first = uploads();
        let second = uploads();
        second.patch(|s| s.count = 42);

        let mut sub = SelectorSubscription::new(&first, |s| s.count);
        assert_eq!(sub.sync(&second, |s| s.count), 42);
        assert_eq!(first.listener_count(), 0);
        assert_eq!(second.listener_count(), 1);
        assert!(Rc::ptr_eq(sub.controller(), &second));

        first.patch(|s| s.count = 1);
        assert_eq!(sub.get(), 42);
        second.patch(|s| s.count = 43);
        assert_eq!(sub.get(), 43);

        assert!(!sub.rebind(&second));
    }

    #[test]
    fn custom_equality_decides_what_counts_as_change() {
        let store = uploads();
        let same_bucket = Equality::custom(|a: &u32, b: &u32| a / 10 == b / 10);
        let sub = SelectorSubscription::with_equality(&store, |s| s.count, same_bucket);
        let (hits, _guard) = hits(&sub);

        store.patch(|s| s.count = 9);
        assert_eq!(hits.get(), 0);
        assert_eq!(sub.get(), 0);

        store.patch(|s| s.count = 12);
        assert_eq!(hits.get(), 1);
        assert_eq!(sub.get(), 12);
    }

    #[test]
    fn rebind_reprojects_from_new_controller() {
        let first = uploads();
        first.patch(|s| s.count = 1);
        let second = uploads();
        second.patch(|s| s.count = 99);

        let mut sub = SelectorSubscription::new(&first, |s| s.count);
        let (hits, _guard) = hits(&sub);
        assert!(sub.rebind(&second));
        assert_eq!(sub.get(), 99);
        assert_eq!(hits.get(), 1);

        let third = uploads();
        third.patch(|s| s.count = 99);
        assert!(sub.rebind(&third));
        assert_eq!(hits.get(), 1, "equal projection does not notify");
        assert_eq!(second.listener_count(), 0);
        assert_eq!(third.listener_count(), 1);
    }

    #[test]
    fn sync_across_controllers_does_not_notify() {
        let first = uploads();
        let second = uploads();
        second.patch(|s| s.count = 5);

        let mut sub = SelectorSubscription::new(&first, |s| s.count);
        let (hits, _guard) = hits(&sub);
        assert_eq!(sub.sync(&second, |s| s.count), 5);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    #[should_panic(expected = "selector exploded")]
    fn selector_panic_propagates_to_mutator() {
        let store = uploads();
        let _sub = SelectorSubscription::new(&store, |s| {
            assert!(s.count < 10, "selector exploded");
            s.count
        });
        store.patch(|s| s.count = 10);
    }

    #[test]
    fn debug_format() {
        let store = uploads();
        let sub = SelectorSubscription::new(&store, |s| s.paused);
        let dbg = format!("{sub:?}");
        assert!(dbg.contains("SelectorSubscription"));
        assert!(dbg.contains("subscribed: true"));
    }
}
