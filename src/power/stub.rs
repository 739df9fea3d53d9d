//! In-memory [`PowerManager`] for exercising clients.

use crate::ipc::{PeerHandle, Status};
use crate::power::interface::{PowerManager, UID_UNSPECIFIED};
use crate::power::registry::construct_lock_string;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct LockInfo {
    tag: String,
    package: String,
    uid: i32,
}

#[derive(Debug, Clone, Copy)]
struct SuspendRequest {
    event_time_ms: i64,
    reason: i32,
    flags: i32,
}

#[derive(Default)]
struct StubState {
    locks: HashMap<PeerHandle, LockInfo>,
    suspend_requests: Vec<SuspendRequest>,
    reboot_reasons: Vec<String>,
    shutdown_reasons: Vec<String>,
}

/// Records every call it receives.
///
/// Acquiring twice with the same handle, or releasing a handle that was
/// never acquired, is a bug in the client under test and panics.
#[derive(Default)]
pub struct PowerManagerStub {
    state: Mutex<StubState>,
}

/// Diagnostic encoding of a `go_to_sleep` call.
pub fn construct_suspend_request_string(event_time_ms: i64, reason: i32, flags: i32) -> String {
    format!("{},{},{}", event_time_ms, reason, flags)
}

impl PowerManagerStub {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn num_locks(&self) -> usize {
        self.state().locks.len()
    }

    /// Lock string for `lock`, or an empty string if it isn't held.
    pub fn lock_string(&self, lock: &PeerHandle) -> String {
        self.state()
            .locks
            .get(lock)
            .map(|info| construct_lock_string(&info.tag, &info.package, info.uid))
            .unwrap_or_default()
    }

    pub fn num_suspend_requests(&self) -> usize {
        self.state().suspend_requests.len()
    }

    /// Suspend request string for the `index`th `go_to_sleep` call, or an
    /// empty string if there weren't that many.
    pub fn suspend_request_string(&self, index: usize) -> String {
        self.state()
            .suspend_requests
            .get(index)
            .map(|r| construct_suspend_request_string(r.event_time_ms, r.reason, r.flags))
            .unwrap_or_default()
    }

    pub fn reboot_reasons(&self) -> Vec<String> {
        self.state().reboot_reasons.clone()
    }

    pub fn shutdown_reasons(&self) -> Vec<String> {
        self.state().shutdown_reasons.clone()
    }

    fn add_lock(&self, lock: PeerHandle, tag: &str, package: &str, uid: i32) {
        let mut state = self.state();
        assert!(
            !state.locks.contains_key(&lock),
            "Got acquire request for already-registered peer {}",
            lock
        );
        state.locks.insert(
            lock,
            LockInfo {
                tag: tag.to_string(),
                package: package.to_string(),
                uid,
            },
        );
    }
}

#[async_trait]
impl PowerManager for PowerManagerStub {
    async fn acquire_wake_lock(
        &self,
        _flags: i32,
        lock: PeerHandle,
        tag: &str,
        package_name: &str,
    ) -> Status {
        self.add_lock(lock, tag, package_name, UID_UNSPECIFIED);
        Status::Ok
    }

    async fn acquire_wake_lock_with_uid(
        &self,
        _flags: i32,
        lock: PeerHandle,
        tag: &str,
        package_name: &str,
        uid: i32,
    ) -> Status {
        self.add_lock(lock, tag, package_name, uid);
        Status::Ok
    }

    async fn release_wake_lock(&self, lock: PeerHandle, _flags: i32) -> Status {
        let removed = self.state().locks.remove(&lock);
        assert!(
            removed.is_some(),
            "Got release request for unregistered peer {}",
            lock
        );
        Status::Ok
    }

    async fn update_wake_lock_uids(&self, _lock: PeerHandle, _uids: &[i32]) -> Status {
        Status::Ok
    }

    async fn power_hint(&self, _hint_id: i32, _data: i32) -> Status {
        Status::Ok
    }

    async fn go_to_sleep(&self, event_time_ms: i64, reason: i32, flags: i32) -> Status {
        self.state().suspend_requests.push(SuspendRequest {
            event_time_ms,
            reason,
            flags,
        });
        Status::Ok
    }

    async fn reboot(&self, _confirm: bool, reason: &str, _wait: bool) -> Status {
        self.state().reboot_reasons.push(reason.to_string());
        Status::Ok
    }

    async fn shutdown(&self, _confirm: bool, reason: &str, _wait: bool) -> Status {
        self.state().shutdown_reasons.push(reason.to_string());
        Status::Ok
    }

    async fn crash(&self, _message: &str) -> Status {
        Status::Ok
    }
}
