//! Structured logging for raysnipe.
//!
//! JSON output in production, pretty output in development, selected by the
//! `RUST_ENV` environment variable.

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
