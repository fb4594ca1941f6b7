//! # stackscope Utilities
//!
//! Shared helpers for the stackscope workspace, chiefly logging setup built on
//! `tracing`. Diagnostics always go to stderr (and optionally a file) so that
//! traces printed on stdout stay machine-comparable.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
