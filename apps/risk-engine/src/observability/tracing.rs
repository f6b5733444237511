//! Structured logging setup.
//!
//! `RUST_LOG` takes precedence over the configured level; the output format
//! is one of `json`, `pretty` or `compact`.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Logging initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Invalid level or filter directive.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// The rejected filter.
        filter: String,
        /// Parser message.
        message: String,
    },
    /// Unknown output format.
    #[error("unknown log format '{0}', expected json, pretty or compact")]
    Format(String),
    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Build the level filter: `RUST_LOG` if set, else the configured level.
///
/// # Errors
///
/// Returns `TracingError::Filter` if the configured level does not parse.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TracingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| TracingError::Filter {
            filter: config.level.clone(),
            message: e.to_string(),
        }),
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error for an invalid level or format, or if a subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.format.as_str() {
        "json" => builder
            .json()
            .with_current_span(config.include_spans)
            .with_span_list(config.include_spans)
            .try_init(),
        "pretty" => builder.pretty().try_init(),
        "compact" => builder.compact().try_init(),
        other => return Err(TracingError::Format(other.to_string())),
    };
    installed.map_err(|e| TracingError::Install(e.to_string()))
}
