//! Tracing utilities for pass instrumentation
//!
//! Provides conditional tracing support for the convolution passes. When
//! the `tracing` feature is enabled, spans are emitted through the
//! `tracing` crate; without the feature, the macros compile to no-ops.
//!
//! # Usage
//!
//! ```rust,ignore
//! fn forward(...) {
//!     let _span = trace_enter!("conv_forward");
//!     // ... pass body
//! }
//! ```

/// Create a tracing span (no-op when tracing feature is disabled)
#[macro_export]
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr) => {
        tracing::span!(tracing::Level::DEBUG, $name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::span!(tracing::Level::DEBUG, $name, $($field)*)
    };
}

/// Create a tracing span (no-op when tracing feature is disabled)
#[macro_export]
#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr) => {
        ()
    };
    ($name:expr, $($field:tt)*) => {
        ()
    };
}

/// Placeholder for span guard when tracing is disabled
#[cfg(not(feature = "tracing"))]
pub struct NoopSpanGuard;

/// Enter a tracing span (no-op when tracing feature is disabled)
#[macro_export]
#[cfg(feature = "tracing")]
macro_rules! trace_enter {
    ($name:expr) => {
        tracing::span!(tracing::Level::DEBUG, $name).entered()
    };
}

/// Enter a tracing span (no-op when tracing feature is disabled)
#[macro_export]
#[cfg(not(feature = "tracing"))]
macro_rules! trace_enter {
    ($name:expr) => {
        $crate::trace::NoopSpanGuard
    };
}

/// Log a tracing event (no-op when tracing feature is disabled)
#[macro_export]
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

/// Log a tracing event (no-op when tracing feature is disabled)
#[macro_export]
#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($($arg:tt)*) => {};
}

// Re-export macros at module level
pub use trace_enter;
pub use trace_event;
pub use trace_span;
