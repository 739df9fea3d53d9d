//! The power manager interface shared by the arbiter, its proxy and test
//! doubles.

use crate::ipc::binder::FIRST_CALL_TRANSACTION;
use crate::ipc::{PeerHandle, Status};
use async_trait::async_trait;

/// Well-known name the arbiter registers under.
pub const SERVICE_NAME: &str = "power";

/// Interface descriptor written at the head of every request parcel.
pub const DESCRIPTOR: &str = "nativepower.IPowerManager";

/// Wake lock level requested by [`crate::power::WakeLock`].
pub const PARTIAL_WAKE_LOCK: i32 = 0x0000_0001;

/// Uid recorded for requests made without one.
pub const UID_UNSPECIFIED: i32 = -1;

/// Transaction codes understood by the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTransaction {
    AcquireWakeLock,
    AcquireWakeLockUid,
    ReleaseWakeLock,
    UpdateWakeLockUids,
    PowerHint,
    GoToSleep,
    Reboot,
    Shutdown,
    Crash,
}

impl PowerTransaction {
    pub fn code(self) -> u32 {
        FIRST_CALL_TRANSACTION
            + match self {
                PowerTransaction::AcquireWakeLock => 0,
                PowerTransaction::AcquireWakeLockUid => 1,
                PowerTransaction::ReleaseWakeLock => 2,
                PowerTransaction::UpdateWakeLockUids => 3,
                PowerTransaction::PowerHint => 4,
                PowerTransaction::GoToSleep => 9,
                PowerTransaction::Reboot => 14,
                PowerTransaction::Shutdown => 15,
                PowerTransaction::Crash => 16,
            }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        [
            PowerTransaction::AcquireWakeLock,
            PowerTransaction::AcquireWakeLockUid,
            PowerTransaction::ReleaseWakeLock,
            PowerTransaction::UpdateWakeLockUids,
            PowerTransaction::PowerHint,
            PowerTransaction::GoToSleep,
            PowerTransaction::Reboot,
            PowerTransaction::Shutdown,
            PowerTransaction::Crash,
        ]
        .into_iter()
        .find(|txn| txn.code() == code)
    }
}

/// Operations offered by the power manager.
///
/// Every call reports its outcome as a [`Status`]; none of them panic on
/// bad input.
#[async_trait]
pub trait PowerManager: Send + Sync {
    async fn acquire_wake_lock(
        &self,
        flags: i32,
        lock: PeerHandle,
        tag: &str,
        package_name: &str,
    ) -> Status;

    async fn acquire_wake_lock_with_uid(
        &self,
        flags: i32,
        lock: PeerHandle,
        tag: &str,
        package_name: &str,
        uid: i32,
    ) -> Status;

    async fn release_wake_lock(&self, lock: PeerHandle, flags: i32) -> Status;

    async fn update_wake_lock_uids(&self, lock: PeerHandle, uids: &[i32]) -> Status;

    async fn power_hint(&self, hint_id: i32, data: i32) -> Status;

    async fn go_to_sleep(&self, event_time_ms: i64, reason: i32, flags: i32) -> Status;

    async fn reboot(&self, confirm: bool, reason: &str, wait: bool) -> Status;

    async fn shutdown(&self, confirm: bool, reason: &str, wait: bool) -> Status;

    async fn crash(&self, message: &str) -> Status;

    /// Human-readable state for diagnostics.
    fn dump(&self) -> String {
        String::new()
    }
}
