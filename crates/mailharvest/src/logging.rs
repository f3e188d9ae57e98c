//! Tracing subscriber setup.
//!
//! Library code logs through both `tracing` and the `log` facade; `init`
//! bridges `log` records into tracing so they share one filter and format.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::LogFormat;
use crate::error::HarvestError;

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter` when set. Returns an error
/// if a global subscriber or logger is already installed.
pub fn init(default_filter: &str, format: LogFormat) -> crate::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_log::LogTracer::init()
        .map_err(|e| HarvestError::Logging(format!("log bridge: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_target(true).with_thread_ids(true)),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(true)),
        ),
    };

    result.map_err(|e| HarvestError::Logging(format!("tracing subscriber: {}", e)))
}

/// Initialize logging for tests (no-op if already initialized).
pub fn init_test() {
    let _ = init("debug", LogFormat::Text);
}
