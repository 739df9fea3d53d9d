use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Arbiter settings. Every field is optional in the YAML file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PowerdConfig {
    /// State directory. Default: `$POWERD_HOME`, else `~/.nativepower`
    #[serde(default)]
    pub home: Option<PathBuf>,
    /// Name the arbiter registers under. Default: "power"
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Listen port; 0 picks an ephemeral port.
    #[serde(default)]
    pub port: u16,
    /// Default tracing filter, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_service_name() -> String {
    crate::power::SERVICE_NAME.to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PowerdConfig {
    fn default() -> Self {
        Self {
            home: None,
            service_name: default_service_name(),
            bind_addr: default_bind_addr(),
            port: 0,
            log_level: default_log_level(),
        }
    }
}

impl PowerdConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `explicit` if given, else `<home>/powerd.yaml` if it exists,
    /// else the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = paths::config_path(&paths::default_home_dir()?);
        if default_path.exists() {
            return Self::load(&default_path);
        }
        Ok(Self::default())
    }

    pub fn home_dir(&self) -> Result<PathBuf> {
        match &self.home {
            Some(home) => Ok(home.clone()),
            None => paths::default_home_dir(),
        }
    }

    pub fn listen_addr(&self) -> String {
        match self.bind_addr.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.bind_addr, self.port),
        }
    }

    fn validate(&self) -> Result<()> {
        let name_ok = !self.service_name.is_empty()
            && self
                .service_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !name_ok {
            anyhow::bail!("Invalid service name '{}'", self.service_name);
        }

        self.bind_addr
            .parse::<IpAddr>()
            .with_context(|| format!("Invalid bind address '{}'", self.bind_addr))?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
