//! Tracing subscriber setup
//!
//! The harness emits `tracing` events at binding resolution, candidate
//! failures, duplicate suppression and installation. Binaries and tests that
//! want to see them call [`init_tracing`] once.

use crate::error::TelemetryError;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install a global fmt subscriber
///
/// `RUST_LOG` takes precedence over `default_directive`.
///
/// # Errors
/// [`TelemetryError::Filter`] for a malformed directive,
/// [`TelemetryError::Init`] when a global subscriber is already set
pub fn init_tracing(default_directive: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let subscriber = build_subscriber(env_filter(default_directive)?, format);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| TelemetryError::Init(e.to_string()))
}

fn build_subscriber(filter: EnvFilter, format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Pretty => Box::new(builder.finish()),
        LogFormat::Json => Box::new(builder.json().finish()),
    }
}

/// Install a subscriber writing through the test harness capture
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("shadow_core=debug"))
        .try_init();
}

fn env_filter(default_directive: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directive)
            .map_err(|e| TelemetryError::Filter(e.to_string())),
    }
}
