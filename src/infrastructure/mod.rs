//! Infrastructure Layer
//!
//! Cross-cutting concerns: logging and process signals.

pub mod logging;
pub mod shutdown;

pub use logging::init_tracing;
pub use shutdown::shutdown_signal;
