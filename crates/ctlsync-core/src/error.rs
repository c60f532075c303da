#![forbid(unsafe_code)]

//! Error taxonomy for the bridge.
//!
//! Errors raised by user-supplied functions are never swallowed: a panicking
//! selector or reaction unwinds through the call that triggered it, and a
//! fallible selector's [`SelectorError`] is cached and handed to the render
//! path. Tearing a subscription down twice is not an error at all.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::payload::MAX_ARITY;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("event payload has {arity} values; at most {max} are allowed", max = MAX_ARITY)]
    PayloadArity { arity: usize },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("failed to install log subscriber: {message}")]
    LoggingInit { message: String },
}

/// A fallible selector failed while projecting controller state.
///
/// Cheap to clone so that it can live in a projection cache and be read on
/// every render until the next successful projection replaces it.
#[derive(Debug, Clone, Error)]
#[error("selector failed: {source}")]
pub struct SelectorError {
    source: Arc<dyn StdError + Send + Sync + 'static>,
}

impl SelectorError {
    /// Wrap an arbitrary error.
    pub fn new(err: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            source: Arc::new(err),
        }
    }

    /// A selector error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// The underlying error.
    #[must_use]
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.source
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}
