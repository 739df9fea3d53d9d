//! File-based naming facility mapping well-known service names to ports.
//!
//! Each service is one JSON record under the directory root:
//! `<root>/<name>.json`, guarded by `<root>/<name>.lock` while it is being
//! replaced.

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// One registered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// PID of the process serving it.
    pub pid: u32,
    /// Registration time (RFC3339).
    pub registered_at: String,
}

impl ServiceRecord {
    /// `host:port`, bracketing IPv6 hosts.
    pub fn address(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceDirectory {
    root: PathBuf,
}

impl ServiceDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.lock", name))
    }

    /// Registers `name` at `addr` for the current process.
    ///
    /// Fails if another live process already holds the name, or if another
    /// registration for the same name is in progress.
    pub fn add_service(&self, name: &str, addr: SocketAddr) -> Result<ServiceRecord> {
        fs::create_dir_all(&self.root).with_context(|| {
            format!(
                "Failed to create service directory: {}",
                self.root.display()
            )
        })?;

        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path(name))
            .context("Failed to open service lock file")?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                anyhow::bail!("Service {} is being registered by another process", name);
            }
            Err(e) => return Err(e).context("Failed to acquire service lock"),
        }

        let result = self.write_record(name, addr);
        FileExt::unlock(&lock_file)?;
        result
    }

    fn write_record(&self, name: &str, addr: SocketAddr) -> Result<ServiceRecord> {
        let pid = std::process::id();
        if let Some(existing) = self.lookup(name)? {
            if existing.pid != pid && process_alive(existing.pid) {
                anyhow::bail!(
                    "Service {} already registered by live PID {}",
                    name,
                    existing.pid
                );
            }
            tracing::info!(
                "Replacing stale registration of {} (PID {})",
                name,
                existing.pid
            );
        }

        let record = ServiceRecord {
            name: name.to_string(),
            host: addr.ip().to_string(),
            port: addr.port(),
            pid,
            registered_at: chrono::Utc::now().to_rfc3339(),
        };

        // Write-then-rename so readers never see a partial record.
        let path = self.record_path(name);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(&record)?)
            .context("Failed to write service record")?;
        fs::rename(&tmp_path, &path).context("Failed to publish service record")?;
        Ok(record)
    }

    /// Returns the record for `name`, if any.
    pub fn lookup(&self, name: &str) -> Result<Option<ServiceRecord>> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read service record: {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse service record: {}", path.display()))?;
        Ok(Some(record))
    }

    /// Removes the registration for `name` if this process owns it.
    pub fn remove_service(&self, name: &str) -> Result<()> {
        match self.lookup(name)? {
            Some(record) if record.pid == std::process::id() => {
                fs::remove_file(self.record_path(name))
                    .context("Failed to remove service record")?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    // Signal 0 only checks existence; EPERM still means the process exists.
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
