//! Storage layout under the arbiter home directory.
//!
//! - `powerd.yaml` - optional configuration
//! - `services/` - service directory records
//! - `properties/` - system properties written by reboot and shutdown
//! - `logs/powerd.log` - daemon log

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "POWERD_HOME";

const POWERD_DIR: &str = ".nativepower";

/// Returns `$POWERD_HOME`, or `~/.nativepower/` when it is unset or empty.
///
/// The directory is not created.
pub fn default_home_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(POWERD_DIR))
}

fn ensure_dir(dir: PathBuf, what: &str) -> Result<PathBuf> {
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {} directory: {}", what, dir.display()))?;
    Ok(dir)
}

/// Returns `<home>/services/`, creating it if needed.
pub fn services_dir(home: &Path) -> Result<PathBuf> {
    ensure_dir(home.join("services"), "services")
}

/// Returns `<home>/properties/`, creating it if needed.
pub fn properties_dir(home: &Path) -> Result<PathBuf> {
    ensure_dir(home.join("properties"), "properties")
}

/// Returns `<home>/logs/powerd.log`, creating the logs directory if needed.
pub fn log_path(home: &Path) -> Result<PathBuf> {
    Ok(ensure_dir(home.join("logs"), "logs")?.join("powerd.log"))
}

pub fn config_path(home: &Path) -> PathBuf {
    home.join("powerd.yaml")
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
