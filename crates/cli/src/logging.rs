use anyhow::{Context, Result};
use storefront_core::tracing::{InstrumentationConfig, init_tracing};
use tracing::Level;

/// Initialize logging for the CLI
///
/// Events go to stderr so command output on stdout stays machine readable.
/// `RUST_LOG` overrides the level given on the command line.
pub fn init_logging(log_level: Level) -> Result<()> {
    let level_str = log_level.as_str().to_lowercase();
    let config = InstrumentationConfig::from_env().with_log_level(format!(
        "storefront={level_str},storefront_http={level_str},storefront_core={level_str}"
    ));

    init_tracing(&config).context("Failed to initialize logging")
}
