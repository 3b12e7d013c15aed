// Dispatcher scenario tests. Unit tests live next to each module.
mod common;
mod message_handling;

// Initialize the logger before any test runs; later calls are ignored
#[ctor::ctor]
fn init() {
    let _ = crate::logger::initialize_logger("debug", false);
}
