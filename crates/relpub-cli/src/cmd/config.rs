//! Config command

use anyhow::{Context, Result};
use relpub_core::Config;

/// Print the effective configuration. The API token is never printed.
pub fn show(config: &Config) -> Result<()> {
    let text = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    print!("{text}");
    Ok(())
}
