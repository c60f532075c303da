//! Logging shims.
//!
//! With the `tracing` feature the macros below forward to [`tracing`]. Without
//! it they expand to nothing, so call sites never need their own `cfg`.
//!
//! The `tracing-json` feature adds [`init_json_logging`], which installs a
//! JSON formatter filtered by `RUST_LOG`.

#[cfg(feature = "tracing")]
pub use tracing;

#[cfg(feature = "tracing")]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::logging::tracing::trace!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::logging::tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::logging::tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

/// Install a global JSON log subscriber.
///
/// The filter is read from `RUST_LOG` and defaults to `info`.
///
/// # Errors
///
/// Returns [`BridgeError::LoggingInit`](crate::BridgeError::LoggingInit) if a
/// global subscriber is already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> crate::Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| crate::BridgeError::LoggingInit {
            message: err.to_string(),
        })
}
