//! System property writes used by reboot and shutdown.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Property consumed by init to reboot or power off the device.
pub const POWERCTL_PROPERTY: &str = "sys.powerctl";

pub trait PropertySetter: Send + Sync {
    fn set_property(&self, name: &str, value: &str) -> Result<()>;

    fn get_property(&self, name: &str) -> Result<Option<String>>;
}

/// Stores each property as a file named after it under `root`.
pub struct FilePropertySetter {
    root: PathBuf,
}

impl FilePropertySetter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            anyhow::bail!("Invalid property name: {:?}", name);
        }
        Ok(self.root.join(name))
    }
}

impl PropertySetter for FilePropertySetter {
    fn set_property(&self, name: &str, value: &str) -> Result<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root).with_context(|| {
            format!(
                "Failed to create properties directory: {}",
                self.root.display()
            )
        })?;

        // Property names can't start with '.', so this never names a property.
        let temp_path = self.root.join(format!(".{}.tmp", name));
        fs::write(&temp_path, value)
            .with_context(|| format!("Failed to write property file: {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to set property {}", name))?;

        tracing::debug!("Set property {}={}", name, value);
        Ok(())
    }

    fn get_property(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(None);
        }
        let value = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read property {}", name))?;
        Ok(Some(value))
    }
}

/// In-memory property store. Writes can be made to fail for error-path
/// tests.
#[derive(Default)]
pub struct MemoryPropertySetter {
    properties: Mutex<HashMap<String, String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryPropertySetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self
            .fail_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = fail;
    }

    /// Current value of `name`, or an empty string if unset.
    pub fn value(&self, name: &str) -> String {
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

impl PropertySetter for MemoryPropertySetter {
    fn set_property(&self, name: &str, value: &str) -> Result<()> {
        if *self
            .fail_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
        {
            anyhow::bail!("Property writes are disabled");
        }
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn get_property(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned())
    }
}
