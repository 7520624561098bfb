//! Application configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Settings the editor needs before it can load a mission.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Root of the mission directory (holds cfgEconomyCore.xml).
    pub mission_root: PathBuf,
    /// Root of the server profile directory (market files, dumps).
    pub profile_root: PathBuf,
    /// Keep a timestamped copy of each file before overwriting it.
    #[serde(default = "default_backups")]
    pub write_backups: bool,
}

fn default_backups() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from an optional `ceedit.toml` next to the working
    /// directory, overridable through `CEEDIT_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from("ceedit")
    }

    fn load_from(name: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .add_source(config::Environment::with_prefix("CEEDIT"))
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }
}
