//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem
//! - Serialize log records into single-line JSON
//! - Keep log output off the request path
//!
//! # Design Decisions
//! - Uses the tracing crate; each logger is a tracing target
//! - Text format for development, JSON format for aggregation
//! - `RUST_LOG` overrides the configured level
//! - Output goes through a non-blocking writer; the returned guard must be
//!   held for the life of the process so buffered lines are flushed

use std::fmt::Debug;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, LogFormat};

/// Per-logger floors applied on top of the base level.
const TARGET_LEVELS: &str =
    "request_logger=info,validation_errors=warn,http_errors=warn,internal_errors=error";

/// Error raised when the global subscriber cannot be installed.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber according to the application settings.
pub fn init_logging(config: &AppConfig) -> Result<WorkerGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!(
            "{},{}",
            config.effective_log_level(),
            TARGET_LEVELS
        ))?,
    };

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .try_init()?,
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .try_init()?,
    }

    tracing::info!(
        format = ?config.log_format,
        level = config.effective_log_level(),
        "Logging configured"
    );
    Ok(guard)
}

/// Serialize a record to one JSON line, falling back to its debug form.
pub fn serialize_record<T: Serialize + Debug>(record: &T) -> String {
    serde_json::to_string(record).unwrap_or_else(|_| format!("{:?}", record))
}

/// Current UTC time in ISO-8601 form with microsecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Milliseconds rounded to two decimals.
pub fn duration_ms(elapsed: Duration) -> f64 {
    let hundredths = (elapsed.as_nanos() + 5_000) / 10_000;
    hundredths as f64 / 100.0
}
