//! # stackmark Utilities
//!
//! Shared utilities for the stackmark workspace, mainly the logging setup
//! built on `tracing`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with, LogFormat, LogLevel, LoggingGuard, LoggingOptions};
pub use tracing::{debug, error, info, trace, warn};
