//! Logging macros that set target to "mei_bridge" for all log calls.
//!
//! Without an explicit target, tracing uses the full module path
//! (e.g., "mei_bridge::channel::registry"), which splits one component's
//! output across many filter directives. These macros keep every log line
//! from this crate under a single "mei_bridge" target so `RUST_LOG=mei_bridge=debug`
//! turns on the whole bridge at once.

#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => { ::tracing::trace!(target: "mei_bridge", $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { ::tracing::debug!(target: "mei_bridge", $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { ::tracing::info!(target: "mei_bridge", $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { ::tracing::warn!(target: "mei_bridge", $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { ::tracing::error!(target: "mei_bridge", $($arg)*) };
}
