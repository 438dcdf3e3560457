//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Filter used when logging is on and `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "debug";

/// Build the filter for the given logging switch.
///
/// With logging on, `RUST_LOG` wins over the default; with logging off
/// everything is filtered out.
pub fn filter(enabled: bool) -> EnvFilter {
    if !enabled {
        return EnvFilter::new("off");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global fmt subscriber.
///
/// Returns an error if a subscriber is already installed.
pub fn init(enabled: bool) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(enabled))
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}
