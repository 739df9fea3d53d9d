//! Client-side wake lock handle.
//!
//! A [`WakeLock`] holds one request at the arbiter from creation until it is
//! released, either explicitly with [`WakeLock::release`] or by being
//! dropped. If the arbiter dies first, the arbiter's own cleanup already
//! reclaimed the request and no release is sent.

use crate::ipc::{DeathNotifier, DeathRegistration, PeerHandle, ServiceManager};
use crate::power::interface::{PowerManager, PARTIAL_WAKE_LOCK, SERVICE_NAME};
use crate::power::proxy::PowerManagerProxy;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct HandleState {
    arbiter_alive: bool,
    released: bool,
}

fn lock_state(state: &Mutex<HandleState>) -> MutexGuard<'_, HandleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct WakeLock {
    tag: String,
    package: String,
    lock: PeerHandle,
    power_manager: PowerManagerProxy,
    notifier: Arc<dyn DeathNotifier>,
    registration: Option<DeathRegistration>,
    state: Arc<Mutex<HandleState>>,
}

impl WakeLock {
    /// Acquires a partial wake lock from the `power` service.
    ///
    /// Returns `None` if the service can't be reached or refuses the
    /// request; nothing is left registered in that case.
    pub async fn create(
        service_manager: &dyn ServiceManager,
        tag: &str,
        package: &str,
    ) -> Option<WakeLock> {
        Self::create_for_service(service_manager, SERVICE_NAME, tag, package).await
    }

    /// Like [`WakeLock::create`], against the service registered as
    /// `service_name`.
    pub async fn create_for_service(
        service_manager: &dyn ServiceManager,
        service_name: &str,
        tag: &str,
        package: &str,
    ) -> Option<WakeLock> {
        let service = service_manager.get_service(service_name).await?;
        let notifier = service_manager.death_notifier();
        let state = Arc::new(Mutex::new(HandleState {
            arbiter_alive: true,
            released: false,
        }));

        let on_death = {
            let state = state.clone();
            let tag = tag.to_string();
            Box::new(move || {
                lock_state(&state).arbiter_alive = false;
                tracing::warn!("Power manager died; lost wake lock for \"{}\"", tag);
            })
        };
        let Some(registration) = notifier.register(service.peer, on_death) else {
            tracing::error!("Power manager {} is already dead", service.peer);
            return None;
        };

        let power_manager = PowerManagerProxy::new(service.binder);
        let lock = service_manager.create_local_peer();
        let status = power_manager
            .acquire_wake_lock(PARTIAL_WAKE_LOCK, lock, tag, package)
            .await;
        if !status.is_ok() {
            tracing::error!(
                "Wake lock acquire request for tag \"{}\" failed with status {}",
                tag,
                status
            );
            notifier.unregister(&registration);
            return None;
        }

        tracing::debug!("Acquired wake lock \"{}\" as {}", tag, lock);
        Some(WakeLock {
            tag: tag.to_string(),
            package: package.to_string(),
            lock,
            power_manager,
            notifier,
            registration: Some(registration),
            state,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Handle identifying this lock to the arbiter.
    pub fn handle(&self) -> PeerHandle {
        self.lock
    }

    /// False once the arbiter is known to have died.
    pub fn arbiter_alive(&self) -> bool {
        lock_state(&self.state).arbiter_alive
    }

    /// Releases the lock and waits for the arbiter's answer.
    pub async fn release(mut self) {
        if let Some(power_manager) = self.begin_release() {
            send_release(power_manager, self.lock, self.tag.clone()).await;
        }
    }

    /// Marks the lock released and drops the death registration. Returns the
    /// proxy to send the release through, or `None` if no call should be
    /// made.
    fn begin_release(&mut self) -> Option<PowerManagerProxy> {
        let arbiter_alive = {
            let mut state = lock_state(&self.state);
            if state.released {
                return None;
            }
            state.released = true;
            state.arbiter_alive
        };

        if let Some(registration) = self.registration.take() {
            self.notifier.unregister(&registration);
        }

        if !arbiter_alive {
            tracing::debug!(
                "Not releasing wake lock \"{}\": power manager is gone",
                self.tag
            );
            return None;
        }
        Some(self.power_manager.clone())
    }
}

async fn send_release(power_manager: PowerManagerProxy, lock: PeerHandle, tag: String) {
    let status = power_manager.release_wake_lock(lock, 0).await;
    if status.is_ok() {
        tracing::debug!("Released wake lock \"{}\"", tag);
    } else {
        tracing::error!(
            "Wake lock release request for \"{}\" failed with status {}",
            tag,
            status
        );
    }
}

impl Drop for WakeLock {
    fn drop(&mut self) {
        let Some(power_manager) = self.begin_release() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(send_release(power_manager, self.lock, self.tag.clone()));
            }
            Err(_) => {
                tracing::error!(
                    "Wake lock \"{}\" dropped outside a runtime; the arbiter will reclaim it when this process exits",
                    self.tag
                );
            }
        }
    }
}

impl std::fmt::Debug for WakeLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeLock")
            .field("tag", &self.tag)
            .field("package", &self.package)
            .field("lock", &self.lock)
            .field("arbiter_alive", &self.arbiter_alive())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/wake_lock_tests.rs"]
mod tests;
