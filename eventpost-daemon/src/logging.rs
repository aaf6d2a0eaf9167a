//! Logging initialization for eventpost-daemon.
//!
//! Builds a `tracing-subscriber` stack from the `[general]` section of
//! `EventpostConfig`. `RUST_LOG` wins over the configured level so
//! operators can raise verbosity without touching the config file.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use eventpost_core::config::GeneralConfig;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
/// `log_format` selects between `"json"` (machine-parseable lines,
/// the production default) and `"pretty"` (human-readable output).
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    let init_result = match config.log_format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "pretty" => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        other => {
            return Err(anyhow::anyhow!(
                "unknown log format '{other}', expected 'json' or 'pretty'"
            ));
        }
    };

    init_result.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}
