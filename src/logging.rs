use tracing::Dispatch;
use tracing::level_filters::LevelFilter;

use crate::error::ConfigError;

/// Parse a log level name. `fatal` and `panic` map to ERROR, the most severe level tracing has.
pub fn parse_level(value: &str) -> Result<LevelFilter, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "error" | "fatal" | "panic" => Ok(LevelFilter::ERROR),
        "off" => Ok(LevelFilter::OFF),
        _ => Err(ConfigError::InvalidLogLevel(value.to_string())),
    }
}

/// Build the logger handle handed to the dispatcher and its workers.
/// Diagnostics go to stderr so stdout carries only rendered results.
pub fn dispatch(level: LevelFilter) -> Dispatch {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    Dispatch::new(subscriber)
}

/// Report an error that ends the process before any logger is configured.
pub fn fatal(err: &(dyn std::error::Error + 'static)) {
    let message = crate::http_probe::report(err);
    tracing::dispatcher::with_default(&dispatch(LevelFilter::ERROR), || {
        tracing::error!(error = %message, "fatal");
    });
}
