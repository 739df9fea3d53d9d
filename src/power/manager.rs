//! The arbiter's power manager service.

use crate::ipc::{PeerHandle, Status};
use crate::power::interface::{PowerManager, UID_UNSPECIFIED};
use crate::power::property::{PropertySetter, POWERCTL_PROPERTY};
use crate::power::registry::WakeLockRegistry;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

/// Prefix written to `sys.powerctl` for reboots.
pub const REBOOT_PREFIX: &str = "reboot,";
/// Prefix written to `sys.powerctl` for shutdowns.
pub const SHUTDOWN_PREFIX: &str = "shutdown,";

pub const REBOOT_REASON_RECOVERY: &str = "recovery";
pub const SHUTDOWN_REASON_USER_REQUESTED: &str = "userrequested";

/// Non-empty reasons accepted by `reboot`.
pub const REBOOT_REASONS: &[&str] = &[REBOOT_REASON_RECOVERY];
/// Non-empty reasons accepted by `shutdown`.
pub const SHUTDOWN_REASONS: &[&str] = &[SHUTDOWN_REASON_USER_REQUESTED];

/// True if `reason` is empty or on `allowed`.
pub fn is_allowed_reason(reason: &str, allowed: &[&str]) -> bool {
    reason.is_empty() || allowed.contains(&reason)
}

fn status_for(success: bool) -> Status {
    if success {
        Status::Ok
    } else {
        Status::UnknownError
    }
}

pub struct PowerManagerService {
    registry: Arc<WakeLockRegistry>,
    property_setter: Arc<dyn PropertySetter>,
}

impl PowerManagerService {
    pub fn new(registry: Arc<WakeLockRegistry>, property_setter: Arc<dyn PropertySetter>) -> Self {
        Self {
            registry,
            property_setter,
        }
    }

    pub fn registry(&self) -> &Arc<WakeLockRegistry> {
        &self.registry
    }

    /// Validates `reason` and writes `prefix + reason` to `sys.powerctl`.
    fn request_power_state(
        &self,
        action: &str,
        prefix: &str,
        allowed: &[&str],
        reason: &str,
    ) -> Status {
        if !is_allowed_reason(reason, allowed) {
            tracing::warn!("Ignoring {} request with invalid reason \"{}\"", action, reason);
            return Status::BadValue;
        }

        tracing::info!("Requesting {} with reason \"{}\"", action, reason);
        let value = format!("{}{}", prefix, reason);
        match self.property_setter.set_property(POWERCTL_PROPERTY, &value) {
            Ok(()) => Status::Ok,
            Err(e) => {
                tracing::error!("Failed to set {} to \"{}\": {:#}", POWERCTL_PROPERTY, value, e);
                Status::UnknownError
            }
        }
    }
}

#[async_trait]
impl PowerManager for PowerManagerService {
    async fn acquire_wake_lock(
        &self,
        _flags: i32,
        lock: PeerHandle,
        tag: &str,
        package_name: &str,
    ) -> Status {
        status_for(
            self.registry
                .add_request(lock, tag, package_name, UID_UNSPECIFIED),
        )
    }

    async fn acquire_wake_lock_with_uid(
        &self,
        _flags: i32,
        lock: PeerHandle,
        tag: &str,
        package_name: &str,
        uid: i32,
    ) -> Status {
        status_for(self.registry.add_request(lock, tag, package_name, uid))
    }

    async fn release_wake_lock(&self, lock: PeerHandle, _flags: i32) -> Status {
        status_for(self.registry.remove_request(lock))
    }

    async fn update_wake_lock_uids(&self, lock: PeerHandle, uids: &[i32]) -> Status {
        tracing::warn!(
            "Not implemented: update_wake_lock_uids lock={} len={}",
            lock,
            uids.len()
        );
        Status::Ok
    }

    async fn power_hint(&self, hint_id: i32, data: i32) -> Status {
        tracing::warn!("Not implemented: power_hint hint_id={} data={}", hint_id, data);
        Status::Ok
    }

    async fn go_to_sleep(&self, event_time_ms: i64, reason: i32, flags: i32) -> Status {
        tracing::warn!(
            "Not implemented: go_to_sleep event_time_ms={} reason={} flags={}",
            event_time_ms,
            reason,
            flags
        );
        Status::Ok
    }

    async fn reboot(&self, _confirm: bool, reason: &str, _wait: bool) -> Status {
        self.request_power_state("reboot", REBOOT_PREFIX, REBOOT_REASONS, reason)
    }

    async fn shutdown(&self, _confirm: bool, reason: &str, _wait: bool) -> Status {
        self.request_power_state("shutdown", SHUTDOWN_PREFIX, SHUTDOWN_REASONS, reason)
    }

    async fn crash(&self, message: &str) -> Status {
        tracing::warn!("Not implemented: crash message={}", message);
        Status::Ok
    }

    fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "held: {}", self.registry.is_held());
        let requests = self.registry.requests();
        let _ = writeln!(out, "requests: {}", requests.len());
        let _ = writeln!(out, "reclaimed: {}", self.registry.reclaimed_count());
        for request in requests {
            let _ = writeln!(
                out,
                "  {} owner={} since={}",
                request.lock_string(),
                request.owner,
                request.acquired_at.to_rfc3339()
            );
        }
        out
    }
}

#[cfg(test)]
#[path = "tests/manager_tests.rs"]
mod tests;
