#![no_main]

use std::rc::Rc;

use arbitrary::Arbitrary;
use ctlsync_core::{Controller, Payload, Store};
use ctlsync_runtime::{EventSubscription, SelectorSubscription};
use libfuzzer_sys::fuzz_target;

const EVENTS: [&str; 2] = ["done", "error"];

#[derive(Arbitrary, Debug)]
enum Op {
    SetLeft(u8),
    SetRight(u8),
    Emit { event: bool, value: u8 },
    Clear(u8),
    DropSelector(u8),
    DropEvent(u8),
    AddSelector,
    AddEvent(bool),
}

type Pair = (u8, u8);

fuzz_target!(|ops: Vec<Op>| {
    let store: Rc<Store<Pair, u8>> = Store::shared((0, 0));
    let mut selectors: Vec<SelectorSubscription<Store<Pair, u8>, u8>> = Vec::new();
    let mut events: Vec<(usize, EventSubscription<Store<Pair, u8>>, Option<u8>)> = Vec::new();

    for op in ops.into_iter().take(256) {
        match op {
            Op::SetLeft(v) => store.patch(|s| s.0 = v),
            Op::SetRight(v) => store.patch(|s| s.1 = v),
            Op::Emit { event, value } => {
                let idx = usize::from(event);
                store.emit(EVENTS[idx], (value,));
                for (e, _, expected) in &mut events {
                    if *e == idx {
                        *expected = Some(value);
                    }
                }
            }
            Op::Clear(i) => {
                if !events.is_empty() {
                    let i = usize::from(i) % events.len();
                    events[i].1.clear();
                    events[i].2 = None;
                }
            }
            Op::DropSelector(i) => {
                if !selectors.is_empty() {
                    let i = usize::from(i) % selectors.len();
                    selectors.swap_remove(i);
                }
            }
            Op::DropEvent(i) => {
                if !events.is_empty() {
                    let i = usize::from(i) % events.len();
                    events.swap_remove(i);
                }
            }
            Op::AddSelector => selectors.push(SelectorSubscription::new(&store, |s: &Pair| s.0)),
            Op::AddEvent(event) => {
                let idx = usize::from(event);
                events.push((idx, EventSubscription::new(&store, EVENTS[idx]), None));
            }
        }

        let left = store.state().0;
        for sel in &selectors {
            assert_eq!(sel.get(), left);
        }
        for (_, sub, expected) in &events {
            assert_eq!(sub.payload(), expected.map(|v| Payload::from((v,))));
        }
        assert_eq!(store.listener_count(), selectors.len());
        let live: usize = EVENTS
            .iter()
            .map(|name| store.event_listener_count(name))
            .sum();
        assert_eq!(live, events.len());
    }
});
