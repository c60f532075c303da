#![forbid(unsafe_code)]

//! Property-based invariant tests for the reference `Store`.
//!
//! For any interleaving of registrations, teardowns, state writes, and
//! event emissions:
//!
//! 1. Every live state listener sees every write exactly once, with the
//!    state as of that write.
//! 2. Dropped listeners are never called again.
//! 3. Listener counts track live guards; empty event registries vanish.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ctlsync_core::{Controller, EventName, Payload, Store, Subscription};
use proptest::prelude::*;

const EVENTS: [&str; 2] = ["done", "error"];

#[derive(Debug, Clone)]
enum Op {
    Listen,
    ListenEvent(usize),
    Drop(usize),
    Set(u16),
    Emit(usize, u16),
}

// ── Strategies ──────────────────────────────────────────────────────────

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Listen),
        (0..EVENTS.len()).prop_map(Op::ListenEvent),
        any::<usize>().prop_map(Op::Drop),
        any::<u16>().prop_map(Op::Set),
        (0..EVENTS.len(), any::<u16>()).prop_map(|(e, v)| Op::Emit(e, v)),
    ]
}

// ── Model ───────────────────────────────────────────────────────────────

struct Probe {
    event: Option<usize>,
    seen: Rc<RefCell<Vec<u16>>>,
    expected: Vec<u16>,
    guard: Subscription,
}

struct Harness {
    store: Rc<Store<u16, u16>>,
    live: Vec<Probe>,
    dead: Vec<(Rc<RefCell<Vec<u16>>>, usize)>,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Store::shared(0),
            live: Vec::new(),
            dead: Vec::new(),
        }
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Listen => {
                let seen = Rc::new(RefCell::new(Vec::new()));
                let sink = Rc::clone(&seen);
                let guard = self
                    .store
                    .on_state_change(Rc::new(move |s: &u16| sink.borrow_mut().push(*s)));
                self.live.push(Probe {
                    event: None,
                    seen,
                    expected: Vec::new(),
                    guard,
                });
            }
            Op::ListenEvent(e) => {
                let seen = Rc::new(RefCell::new(Vec::new()));
                let sink = Rc::clone(&seen);
                let guard = self.store.on_event(
                    &EventName::from(EVENTS[e]),
                    Rc::new(move |p: &Payload<u16>| sink.borrow_mut().push(p.as_slice()[0])),
                );
                self.live.push(Probe {
                    event: Some(e),
                    seen,
                    expected: Vec::new(),
                    guard,
                });
            }
            Op::Drop(i) => {
                if self.live.is_empty() {
                    return;
                }
                let mut probe = self.live.swap_remove(i % self.live.len());
                probe.guard.unsubscribe();
                let frozen = probe.seen.borrow().len();
                self.dead.push((probe.seen, frozen));
            }
            Op::Set(v) => {
                self.store.set_state(v);
                for probe in self.live.iter_mut().filter(|p| p.event.is_none()) {
                    probe.expected.push(v);
                }
            }
            Op::Emit(e, v) => {
                self.store.emit(EVENTS[e], (v,));
                for probe in self.live.iter_mut().filter(|p| p.event == Some(e)) {
                    probe.expected.push(v);
                }
            }
        }
    }

    fn check(&self) {
        for probe in &self.live {
            assert_eq!(*probe.seen.borrow(), probe.expected);
        }
        for (seen, frozen) in &self.dead {
            assert_eq!(seen.borrow().len(), *frozen, "dropped listener was called");
        }
        let state_live = self.live.iter().filter(|p| p.event.is_none()).count();
        assert_eq!(self.store.listener_count(), state_live);
        for (e, name) in EVENTS.iter().enumerate() {
            let live = self.live.iter().filter(|p| p.event == Some(e)).count();
            assert_eq!(self.store.event_listener_count(name), live);
        }
    }
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn listeners_track_guards(ops in prop::collection::vec(op(), 1..64)) {
        let mut harness = Harness::new();
        for op in &ops {
            harness.apply(op);
            harness.check();
        }
    }

    #[test]
    fn listener_dropping_itself_mid_dispatch_sees_one_write(writes in 1u16..8) {
        let store: Rc<Store<u16>> = Store::shared(0);
        let hits = Rc::new(Cell::new(0u32));
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let h = Rc::clone(&hits);
        let s = Rc::clone(&slot);
        let guard = store.on_state_change(Rc::new(move |_: &u16| {
            h.set(h.get() + 1);
            let taken = s.borrow_mut().take();
            drop(taken);
        }));
        *slot.borrow_mut() = Some(guard);

        for v in 0..writes {
            store.set_state(v);
        }
        prop_assert_eq!(hits.get(), 1);
        prop_assert_eq!(store.listener_count(), 0);
    }
}
