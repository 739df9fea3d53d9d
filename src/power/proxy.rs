//! Client-side [`PowerManager`] that marshals calls into transactions.

use crate::ipc::binder::{DUMP_TRANSACTION, PING_TRANSACTION};
use crate::ipc::{BinderObject, Parcel, PeerHandle, Status};
use crate::power::interface::{PowerManager, PowerTransaction, DESCRIPTOR};
use async_trait::async_trait;
use std::sync::Arc;

/// Talks to a power manager binder, local or remote.
///
/// A binder whose connection is gone answers every call with
/// `Status::DeadObject`.
#[derive(Clone)]
pub struct PowerManagerProxy {
    binder: Arc<dyn BinderObject>,
}

impl PowerManagerProxy {
    pub fn new(binder: Arc<dyn BinderObject>) -> Self {
        Self { binder }
    }

    fn request() -> Parcel {
        Parcel::for_interface(DESCRIPTOR)
    }

    /// Asks the remote object for its diagnostic dump.
    pub async fn fetch_dump(&self) -> Result<String, Status> {
        let mut reply = self
            .binder
            .on_transact(DUMP_TRANSACTION, Parcel::new(), 0)
            .await?;
        reply.read_string()
    }

    /// Checks that the remote object answers pings.
    pub async fn ping(&self) -> Status {
        match self
            .binder
            .on_transact(PING_TRANSACTION, Parcel::new(), 0)
            .await
        {
            Ok(_) => Status::Ok,
            Err(status) => status,
        }
    }

    async fn call(&self, txn: PowerTransaction, data: Parcel) -> Status {
        match self.binder.on_transact(txn.code(), data, 0).await {
            Ok(_) => Status::Ok,
            Err(status) => status,
        }
    }
}

#[async_trait]
impl PowerManager for PowerManagerProxy {
    async fn acquire_wake_lock(
        &self,
        flags: i32,
        lock: PeerHandle,
        tag: &str,
        package_name: &str,
    ) -> Status {
        let mut data = Self::request();
        data.write_binder(lock);
        data.write_i32(flags);
        data.write_string(tag);
        data.write_string(package_name);
        self.call(PowerTransaction::AcquireWakeLock, data).await
    }

    async fn acquire_wake_lock_with_uid(
        &self,
        flags: i32,
        lock: PeerHandle,
        tag: &str,
        package_name: &str,
        uid: i32,
    ) -> Status {
        let mut data = Self::request();
        data.write_binder(lock);
        data.write_i32(flags);
        data.write_string(tag);
        data.write_string(package_name);
        data.write_i32(uid);
        self.call(PowerTransaction::AcquireWakeLockUid, data).await
    }

    async fn release_wake_lock(&self, lock: PeerHandle, flags: i32) -> Status {
        let mut data = Self::request();
        data.write_binder(lock);
        data.write_i32(flags);
        self.call(PowerTransaction::ReleaseWakeLock, data).await
    }

    async fn update_wake_lock_uids(&self, lock: PeerHandle, uids: &[i32]) -> Status {
        let mut data = Self::request();
        data.write_binder(lock);
        data.write_i32_array(uids);
        self.call(PowerTransaction::UpdateWakeLockUids, data).await
    }

    async fn power_hint(&self, hint_id: i32, hint_data: i32) -> Status {
        let mut data = Self::request();
        data.write_i32(hint_id);
        data.write_i32(hint_data);
        self.call(PowerTransaction::PowerHint, data).await
    }

    async fn go_to_sleep(&self, event_time_ms: i64, reason: i32, flags: i32) -> Status {
        let mut data = Self::request();
        data.write_i64(event_time_ms);
        data.write_i32(reason);
        data.write_i32(flags);
        self.call(PowerTransaction::GoToSleep, data).await
    }

    async fn reboot(&self, confirm: bool, reason: &str, wait: bool) -> Status {
        let mut data = Self::request();
        data.write_bool(confirm);
        data.write_string(reason);
        data.write_bool(wait);
        self.call(PowerTransaction::Reboot, data).await
    }

    async fn shutdown(&self, confirm: bool, reason: &str, wait: bool) -> Status {
        let mut data = Self::request();
        data.write_bool(confirm);
        data.write_string(reason);
        data.write_bool(wait);
        self.call(PowerTransaction::Shutdown, data).await
    }

    async fn crash(&self, message: &str) -> Status {
        let mut data = Self::request();
        data.write_string(message);
        self.call(PowerTransaction::Crash, data).await
    }
}
