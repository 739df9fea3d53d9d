//! Tracing setup for the `powerd` binary.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub enum LogTarget {
    Stderr,
    /// Append to a file, without ANSI colors.
    File(PathBuf),
}

/// `RUST_LOG` if set and valid, else `default_level`.
fn build_filter(env_directives: Option<String>, default_level: &str) -> Result<EnvFilter> {
    if let Some(directives) = env_directives.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(&directives) {
            Ok(filter) => return Ok(filter),
            Err(e) => eprintln!("Ignoring invalid RUST_LOG \"{}\": {}", directives, e),
        }
    }
    EnvFilter::try_new(default_level)
        .with_context(|| format!("Invalid log level '{}'", default_level))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(default_level: &str, target: LogTarget) -> Result<()> {
    let filter = build_filter(std::env::var("RUST_LOG").ok(), default_level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };
    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_directives_take_precedence() {
        let filter = build_filter(Some("nativepower=trace".to_string()), "warn").unwrap();
        assert_eq!(filter.to_string(), "nativepower=trace");
    }

    #[test]
    fn falls_back_to_default_level() {
        let filter = build_filter(None, "debug").unwrap();
        assert_eq!(filter.to_string(), "debug");

        let filter = build_filter(Some("  ".to_string()), "info").unwrap();
        assert_eq!(filter.to_string(), "info");

        let filter = build_filter(Some("foo=notalevel".to_string()), "info").unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn invalid_default_level_is_an_error() {
        assert!(build_filter(None, "foo=notalevel").is_err());
    }
}
