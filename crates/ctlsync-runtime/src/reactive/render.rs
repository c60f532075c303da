#![forbid(unsafe_code)]

//! Render invalidation.
//!
//! The bridge never renders. It marks a [`RenderRequest`] dirty and leaves the
//! decision of when to run a render pass to the host. Several requests
//! between two passes coalesce into one dirty flag; [`RenderRequest::count`]
//! still records each of them so redundant notifications are measurable.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

#[derive(Default)]
struct RequestState {
    dirty: Cell<bool>,
    count: Cell<u64>,
}

/// A shared, coalescing "needs render" flag.
///
/// Cloning yields another handle to the same flag.
#[derive(Clone, Default)]
pub struct RenderRequest {
    inner: Rc<RequestState>,
}

impl RenderRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark dirty.
    pub fn request(&self) {
        self.inner.dirty.set(true);
        self.inner.count.set(self.inner.count.get() + 1);
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.inner.dirty.replace(false)
    }

    /// Total number of requests ever made.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.inner.count.get()
    }
}

impl fmt::Debug for RenderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderRequest")
            .field("dirty", &self.is_dirty())
            .field("count", &self.count())
            .finish()
    }
}
