#![forbid(unsafe_code)]

//! ctlsync public facade.
//!
//! Keeps a rendering layer in sync with a long-lived controller object:
//! selector subscriptions project controller state and re-render only on
//! change; event subscriptions buffer the latest payload of a named event.
//!
//! ```
//! use ctlsync::prelude::*;
//!
//! #[derive(Clone)]
//! struct Uploads {
//!     done: u32,
//! }
//!
//! let uploader: std::rc::Rc<Store<Uploads, u32>> = Store::shared(Uploads { done: 0 });
//! let mut component = Component::new();
//!
//! let view = |c: &mut Component| {
//!     c.render(|hooks| {
//!         let done = hooks.use_selector(&uploader, |s| s.done);
//!         let (last, clear) = hooks.use_event(&uploader, "upload-success");
//!         (done, last, clear)
//!     })
//! };
//!
//! let (done, last, _) = view(&mut component);
//! assert_eq!((done, last), (0, None));
//!
//! uploader.patch(|s| s.done += 1);
//! uploader.emit("upload-success", (7,));
//! assert!(component.is_dirty());
//!
//! let (done, last, clear) = view(&mut component);
//! assert_eq!(done, 1);
//! assert_eq!(last, Some(Payload::from((7,))));
//! assert!(clear.clear());
//! ```

pub use ctlsync_core::{
    BridgeError, Controller, EventName, Payload, Result, SelectorError, Store, Subscription,
};
#[cfg(feature = "runtime")]
pub use ctlsync_runtime::{
    ClearHandle, Component, Equality, EventSubscription, Hooks, Observable, RenderRequest,
    SelectorSubscription,
};

#[cfg(feature = "tracing-json")]
pub use ctlsync_core::logging::init_json_logging;

/// Glob-import for the common types.
pub mod prelude {
    pub use ctlsync_core as core;
    #[cfg(feature = "runtime")]
    pub use ctlsync_runtime as runtime;

    pub use ctlsync_core::{Controller, EventName, Payload, SelectorError, Store, Subscription};
    #[cfg(feature = "runtime")]
    pub use ctlsync_runtime::{
        ClearHandle, Component, Equality, EventSubscription, Hooks, SelectorSubscription,
    };
}
