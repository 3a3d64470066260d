//! `sdkinit_log` v1:
//! One-shot tracing subscriber setup for the init binary.
//!
//! Logs always go to stderr so the child's stdout stays untouched.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is not provided.
pub const C_LOG_LEVEL_DEFAULT: &str = "info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumLogFormat {
    /// Human-readable single-line text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging options.
#[derive(Debug, Clone)]
pub struct SpecLogOptions {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Line format.
    pub format: EnumLogFormat,
}

impl Default for SpecLogOptions {
    fn default() -> Self {
        Self {
            level: C_LOG_LEVEL_DEFAULT.to_string(),
            format: EnumLogFormat::default(),
        }
    }
}

/// Logging setup failures.
#[derive(Debug, Error)]
pub enum LogInitError {
    /// Filter directive did not parse.
    #[error("invalid log filter `{directive}`: {source}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser error.
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the filter from a `RUST_LOG` value when it parses, otherwise from
/// `spec_log_options.level`.
pub fn derive_env_filter(
    spec_log_options: &SpecLogOptions,
    rust_log: Option<&str>,
) -> Result<EnvFilter, LogInitError> {
    if let Some(filter) = rust_log.and_then(|v| EnvFilter::try_new(v).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(&spec_log_options.level).map_err(|e| LogInitError::InvalidFilter {
        directive: spec_log_options.level.clone(),
        source: e,
    })
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error when the level directive is invalid or another
/// subscriber has already been set globally.
pub fn init_logging(spec_log_options: &SpecLogOptions) -> Result<(), LogInitError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = derive_env_filter(spec_log_options, rust_log.as_deref())?;
    let registry = tracing_subscriber::registry().with(filter);

    match spec_log_options.format {
        EnumLogFormat::Text => registry
            .with(
                fmt_layer::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()?,
        EnumLogFormat::Json => registry
            .with(
                fmt_layer::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LogInitError, SpecLogOptions, derive_env_filter, init_logging};

    #[test]
    fn rust_log_value_takes_precedence_over_level() {
        let spec_log_options = SpecLogOptions {
            level: "sdkinit=loud".to_string(),
            ..SpecLogOptions::default()
        };
        let filter = derive_env_filter(&spec_log_options, Some("debug")).expect("filter");
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn invalid_level_is_reported_when_rust_log_is_absent() {
        let spec_log_options = SpecLogOptions {
            level: "sdkinit=loud".to_string(),
            ..SpecLogOptions::default()
        };
        let err = derive_env_filter(&spec_log_options, None).expect_err("bad level");
        assert!(matches!(err, LogInitError::InvalidFilter { .. }));

        let filter = derive_env_filter(&SpecLogOptions::default(), Some("sdkinit=loud"))
            .expect("fallback to level");
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn second_install_is_rejected() {
        let spec_log_options = SpecLogOptions::default();
        init_logging(&spec_log_options).expect("first install");
        let err = init_logging(&spec_log_options).expect_err("second install");
        assert!(matches!(err, LogInitError::Install(_)));
    }
}
