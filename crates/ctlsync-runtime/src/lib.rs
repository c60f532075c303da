#![forbid(unsafe_code)]

//! Runtime: the bridge between controllers and a rendering layer.
//!
//! - [`select`]: project controller state through a selector, notifying only
//!   when the projection changes.
//! - [`event`]: keep the latest payload of a named controller event, with a
//!   clear handle and an optional synchronous reaction.
//! - [`hooks`]: a component host that keeps these subscriptions alive across
//!   renders and tears them down on unmount.
//! - [`reactive`]: the observable cell and render-invalidation primitives the
//!   subscriptions write into.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`) and synchronous. The
//! only effect the bridge has on a rendering layer is marking a
//! [`RenderRequest`] dirty; when to re-render is the host's decision.

pub mod event;
pub mod hooks;
pub mod reactive;
pub mod select;

pub use event::{ClearHandle, EventSubscription, Reaction};
pub use hooks::{Component, Hooks};
pub use reactive::{Observable, RenderRequest};
pub use select::{Equality, SelectorSubscription};
