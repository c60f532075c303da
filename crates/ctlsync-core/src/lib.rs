#![forbid(unsafe_code)]

//! Core: the controller contract, subscription guards, event payloads, and a
//! reference in-memory controller.
//!
//! A *controller* is a long-lived object that owns state and emits named
//! events independently of any UI component's lifetime. This crate defines
//! the narrow surface the bridge needs from it ([`Controller`]) and the
//! RAII [`Subscription`] guard that pairs every registration with exactly one
//! teardown.
//!
//! [`Store`] is a small framework-agnostic controller used by the runtime's
//! tests, benches, and fuzz targets. Real applications implement
//! [`Controller`] for their own types.

#[macro_use]
pub mod logging;

pub mod controller;
pub mod error;
pub mod payload;
pub mod store;
pub mod subscription;

pub use controller::{Controller, EventListener, EventName, StateListener};
pub use error::{BridgeError, Result, SelectorError};
pub use payload::{MAX_ARITY, Payload};
pub use store::Store;
pub use subscription::{Liveness, Subscription};
