//! # Logging Utilities
//!
//! Logging setup for stackmark binaries using `tracing`.
//!
//! Library crates only emit events; a binary decides where they go by calling
//! one of the init functions here once at startup. Logs always go to stderr
//! so that stdout stays free for command output, optionally mirrored to a
//! daily-rolling file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stackmark_utils::init_logging;
//!
//! // Reads RUST_LOG, STACKMARK_LOG_FORMAT and STACKMARK_LOG_FILE
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Level or filter directives (e.g. `debug`, `stackmark_core=trace`)
//! - `STACKMARK_LOG_FORMAT`: `pretty` (default) or `json`
//! - `STACKMARK_LOG_FILE`: Optional file to mirror logs into
//!
//! The returned [`LoggingGuard`] flushes the file writer when dropped; keep it
//! alive for the life of the program.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_ENV: &str = "STACKMARK_LOG_FORMAT";
const FILE_ENV: &str = "STACKMARK_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable, colored on terminals
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_owned())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level (default)
    #[default]
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_owned())),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggingOptions
{
    /// Level used when `RUST_LOG` is unset or unparsable. An explicit level
    /// set with [`LoggingOptions::level`] wins over `RUST_LOG`.
    pub level: LogLevel,
    /// Output format for both console and file.
    pub format: LogFormat,
    /// File to mirror logs into.
    pub file: Option<PathBuf>,
    explicit_level: bool,
}

impl LoggingOptions
{
    /// Options taken from `STACKMARK_LOG_FORMAT` and `STACKMARK_LOG_FILE`.
    ///
    /// Unparsable values fall back to the defaults.
    pub fn from_env() -> Self
    {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self
    {
        let format = lookup(FORMAT_ENV)
            .and_then(|value| value.parse::<LogFormat>().ok())
            .unwrap_or_default();
        let file = lookup(FILE_ENV).filter(|value| !value.is_empty()).map(PathBuf::from);

        Self {
            format,
            file,
            ..Self::default()
        }
    }

    /// Force `level`, ignoring `RUST_LOG`.
    #[must_use]
    pub fn level(mut self, level: LogLevel) -> Self
    {
        self.level = level;
        self.explicit_level = true;
        self
    }

    /// Set the output format.
    #[must_use]
    pub fn format(mut self, format: LogFormat) -> Self
    {
        self.format = format;
        self
    }

    fn filter(&self) -> EnvFilter
    {
        let fallback = || EnvFilter::new(Level::from(self.level).to_string());
        if self.explicit_level {
            return fallback();
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback())
    }
}

/// Keeps the file writer alive; dropping it flushes pending lines.
#[derive(Debug)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init_logging_with(&LoggingOptions::from_env())
}

/// Initialize logging with explicit options.
///
/// ## Example
///
/// ```rust,no_run
/// use stackmark_utils::{init_logging_with, LogFormat, LogLevel, LoggingOptions};
///
/// let options = LoggingOptions::from_env().level(LogLevel::Debug).format(LogFormat::Json);
/// let _guard = init_logging_with(&options).expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with(options: &LoggingOptions) -> Result<LoggingGuard, LoggingError>
{
    let mut layers: Vec<BoxedLayer> = vec![console_layer(options)];

    let guard = match &options.file {
        Some(path) => {
            let (writer, guard) = file_writer(path);
            layers.push(file_layer(options, writer));
            Some(guard)
        }
        None => None,
    };

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

fn console_layer(options: &LoggingOptions) -> BoxedLayer
{
    let layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(io::stderr);

    match options.format {
        LogFormat::Pretty => layer.with_ansi(true).with_filter(options.filter()).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(options.filter())
            .boxed(),
    }
}

fn file_layer(options: &LoggingOptions, writer: NonBlocking) -> BoxedLayer
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    match options.format {
        LogFormat::Pretty => layer.with_ansi(false).with_filter(options.filter()).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(options.filter())
            .boxed(),
    }
}

fn file_writer(path: &Path) -> (NonBlocking, WorkerGuard)
{
    let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_name = path.file_name().unwrap_or_default();
    tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, file_name))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Unknown log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Unknown log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("prod").unwrap(), LogFormat::Json);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_options_from_lookup()
    {
        let vars: HashMap<&str, &str> = [(FORMAT_ENV, "json"), (FILE_ENV, "/tmp/stackmark.log")].into();
        let options = LoggingOptions::from_lookup(|name| vars.get(name).map(|v| (*v).to_owned()));

        assert_eq!(options.format, LogFormat::Json);
        assert_eq!(options.file, Some(PathBuf::from("/tmp/stackmark.log")));
        assert_eq!(options.level, LogLevel::Warn);
    }

    #[test]
    fn test_bad_env_values_fall_back()
    {
        let options = LoggingOptions::from_lookup(|name| match name {
            FORMAT_ENV => Some("xml".to_owned()),
            FILE_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(options, LoggingOptions::default());
    }

    #[test]
    fn test_second_init_fails()
    {
        let options = LoggingOptions::default().level(LogLevel::Error);
        let _first = init_logging_with(&options);
        assert!(matches!(init_logging_with(&options), Err(LoggingError::InitializationFailed(_))));
    }
}
