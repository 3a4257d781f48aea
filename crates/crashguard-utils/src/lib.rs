//! # crashguard Utilities
//!
//! Shared logging setup and helpers for crashguard.
//!
//! The crash handlers themselves never go through `tracing` from signal
//! context; this crate configures the subscriber used for setup messages and
//! for the uncaught-panic line.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
