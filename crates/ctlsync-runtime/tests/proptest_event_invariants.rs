#![forbid(unsafe_code)]

//! Property-based invariant tests for event subscriptions.
//!
//! For any interleaving of emits, clears, and teardowns across several
//! subscriptions:
//!
//! 1. A buffer is empty before its event first fires.
//! 2. A live buffer always holds the latest occurrence of its event.
//! 3. Clearing empties only the cleared buffer and notifies only if it was
//!    non-empty.
//! 4. Torn-down subscriptions neither change nor notify.

use std::cell::Cell;
use std::rc::Rc;

use ctlsync_core::{Payload, Store, Subscription};
use ctlsync_runtime::EventSubscription;
use proptest::prelude::*;

const EVENTS: [&str; 2] = ["done", "error"];

/// Subscription `i` listens to `EVENTS[i % 2]`.
const SUBSCRIPTIONS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Emit { event: usize, args: Vec<i32> },
    Clear(usize),
    Teardown(usize),
}

type Uploader = Store<(), i32>;

// ── Strategies ──────────────────────────────────────────────────────────

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..EVENTS.len(), proptest::collection::vec(any::<i32>(), 0..=3))
            .prop_map(|(event, args)| Op::Emit { event, args }),
        2 => (0..SUBSCRIPTIONS).prop_map(Op::Clear),
        1 => (0..SUBSCRIPTIONS).prop_map(Op::Teardown),
    ]
}

// ── Model ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct Model {
    buffer: Option<Vec<i32>>,
    writes: usize,
    live: bool,
}

struct Harness {
    store: Rc<Uploader>,
    subs: Vec<EventSubscription<Uploader>>,
    writes: Vec<Rc<Cell<usize>>>,
    _guards: Vec<Subscription>,
    models: Vec<Model>,
}

impl Harness {
    fn new() -> Self {
        let store: Rc<Uploader> = Store::shared(());
        let mut subs = Vec::new();
        let mut writes = Vec::new();
        let mut guards = Vec::new();
        for i in 0..SUBSCRIPTIONS {
            let sub = EventSubscription::new(&store, EVENTS[i % EVENTS.len()]);
            let hits = Rc::new(Cell::new(0));
            let h = Rc::clone(&hits);
            guards.push(sub.observe(move |_| h.set(h.get() + 1)));
            subs.push(sub);
            writes.push(hits);
        }
        let models = vec![
            Model {
                live: true,
                ..Model::default()
            };
            SUBSCRIPTIONS
        ];
        Self {
            store,
            subs,
            writes,
            _guards: guards,
            models,
        }
    }

    fn apply(&mut self, op: &Op) {
        match op {
            Op::Emit { event, args } => {
                let payload = Payload::new(args.clone()).expect("arity is bounded by the strategy");
                self.store.emit(EVENTS[*event], payload);
                for (i, model) in self.models.iter_mut().enumerate() {
                    if model.live && i % EVENTS.len() == *event {
                        model.buffer = Some(args.clone());
                        model.writes += 1;
                    }
                }
            }
            Op::Clear(i) => {
                let cleared = self.subs[*i].clear();
                let model = &mut self.models[*i];
                // Clearing works through the subscription even after
                // teardown; only controller delivery stops.
                let expect = model.buffer.is_some();
                assert_eq!(cleared, expect);
                if expect {
                    model.buffer = None;
                    model.writes += 1;
                }
            }
            Op::Teardown(i) => {
                self.subs[*i].unsubscribe();
                self.models[*i].live = false;
            }
        }
    }

    fn check(&self) -> Result<(), TestCaseError> {
        for (i, model) in self.models.iter().enumerate() {
            let actual = self.subs[i].payload().map(Payload::into_vec);
            prop_assert_eq!(&actual, &model.buffer, "buffer of subscription {}", i);
            prop_assert_eq!(self.writes[i].get(), model.writes, "writes of subscription {}", i);
        }
        for (e, name) in EVENTS.iter().enumerate() {
            let live = self
                .models
                .iter()
                .enumerate()
                .filter(|(i, m)| m.live && i % EVENTS.len() == e)
                .count();
            prop_assert_eq!(self.store.event_listener_count(name), live);
        }
        Ok(())
    }
}

proptest! {
    #[test]
    fn buffers_follow_model(ops in proptest::collection::vec(op(), 0..64)) {
        let mut harness = Harness::new();
        harness.check()?;
        for op in &ops {
            harness.apply(op);
            harness.check()?;
        }
    }

    #[test]
    fn clearing_one_leaves_siblings_untouched(args in proptest::collection::vec(any::<i32>(), 0..=3)) {
        let store: Rc<Uploader> = Store::shared(());
        let a = EventSubscription::new(&store, "done");
        let b = EventSubscription::new(&store, "done");
        store.emit("done", Payload::new(args.clone()).expect("arity is bounded"));

        prop_assert!(a.clear());
        prop_assert!(!a.clear());
        prop_assert_eq!(a.payload(), None);
        prop_assert_eq!(b.payload().map(Payload::into_vec), Some(args));
    }
}
