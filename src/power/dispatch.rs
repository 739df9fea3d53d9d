//! Decodes power manager transactions into [`PowerManager`] calls.

use crate::ipc::{default_transact, BinderObject, Parcel, Status, TransactResult};
use crate::power::interface::{PowerManager, PowerTransaction, DESCRIPTOR};
use async_trait::async_trait;
use std::sync::Arc;

/// Exposes a [`PowerManager`] as a binder object.
///
/// Arguments are read in the order [`crate::power::PowerManagerProxy`]
/// writes them. A call that returns `Status::Ok` is answered with an empty
/// reply; any other status is returned as the transaction error.
pub struct PowerManagerBinder {
    inner: Arc<dyn PowerManager>,
}

impl PowerManagerBinder {
    pub fn new(inner: Arc<dyn PowerManager>) -> Self {
        Self { inner }
    }

    async fn dispatch(&self, txn: PowerTransaction, data: &mut Parcel) -> TransactResult<Status> {
        data.enforce_interface(DESCRIPTOR)?;

        let status = match txn {
            PowerTransaction::AcquireWakeLock => {
                let lock = data.read_binder()?;
                let flags = data.read_i32()?;
                let tag = data.read_string()?;
                let package_name = data.read_string()?;
                self.inner
                    .acquire_wake_lock(flags, lock, &tag, &package_name)
                    .await
            }
            PowerTransaction::AcquireWakeLockUid => {
                let lock = data.read_binder()?;
                let flags = data.read_i32()?;
                let tag = data.read_string()?;
                let package_name = data.read_string()?;
                let uid = data.read_i32()?;
                self.inner
                    .acquire_wake_lock_with_uid(flags, lock, &tag, &package_name, uid)
                    .await
            }
            PowerTransaction::ReleaseWakeLock => {
                let lock = data.read_binder()?;
                let flags = data.read_i32()?;
                self.inner.release_wake_lock(lock, flags).await
            }
            PowerTransaction::UpdateWakeLockUids => {
                let lock = data.read_binder()?;
                let uids = data.read_i32_array()?;
                self.inner.update_wake_lock_uids(lock, &uids).await
            }
            PowerTransaction::PowerHint => {
                let hint_id = data.read_i32()?;
                let hint_data = data.read_i32()?;
                self.inner.power_hint(hint_id, hint_data).await
            }
            PowerTransaction::GoToSleep => {
                let event_time_ms = data.read_i64()?;
                let reason = data.read_i32()?;
                let flags = data.read_i32()?;
                self.inner.go_to_sleep(event_time_ms, reason, flags).await
            }
            PowerTransaction::Reboot => {
                let confirm = data.read_bool()?;
                let reason = data.read_string()?;
                let wait = data.read_bool()?;
                self.inner.reboot(confirm, &reason, wait).await
            }
            PowerTransaction::Shutdown => {
                let confirm = data.read_bool()?;
                let reason = data.read_string()?;
                let wait = data.read_bool()?;
                self.inner.shutdown(confirm, &reason, wait).await
            }
            PowerTransaction::Crash => {
                let message = data.read_string()?;
                self.inner.crash(&message).await
            }
        };
        Ok(status)
    }
}

#[async_trait]
impl BinderObject for PowerManagerBinder {
    fn descriptor(&self) -> &str {
        DESCRIPTOR
    }

    async fn on_transact(&self, code: u32, mut data: Parcel, _flags: u32) -> TransactResult<Parcel> {
        let Some(txn) = PowerTransaction::from_code(code) else {
            return default_transact(self, code);
        };

        let status = self.dispatch(txn, &mut data).await.inspect_err(|status| {
            tracing::warn!("Rejected malformed {:?} transaction: {}", txn, status);
        })?;
        if status.is_ok() {
            Ok(Parcel::new())
        } else {
            Err(status)
        }
    }

    fn dump(&self) -> String {
        self.inner.dump()
    }
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
