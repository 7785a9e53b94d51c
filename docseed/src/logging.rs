//! Tracing subscriber setup for the `docseed` binary.

use anyhow::{Context, anyhow};
use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber filtered by `filter` (`info`, `docseed_core=debug`, ...).
pub fn init(filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter)
        .with_context(|| format!("invalid log filter {filter:?}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!(err))
}
