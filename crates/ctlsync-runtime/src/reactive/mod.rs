#![forbid(unsafe_code)]

//! Reactive cells for the bridge.
//!
//! - [`Observable`]: a shared, version-tracked value with change
//!   notification via subscriber callbacks.
//! - [`RenderRequest`]: a coalescing dirty flag the rendering layer polls.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared
//! ownership. Subscribers are stored as `Weak` function pointers; the strong
//! side lives in the returned [`Subscription`](ctlsync_core::Subscription),
//! so dropping the guard disarms the callback immediately.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per stored value.
//! 2. Subscribers are notified in registration order.
//! 3. `Observable::set` with a value equal to the current one is a no-op.
//! 4. A callback whose guard was dropped is never called again, even within
//!    a notification cycle already in progress.

pub mod observable;
pub mod render;

pub use observable::Observable;
pub use render::RenderRequest;
