//! Arbiter-side registry of outstanding wake lock requests.
//!
//! Requests are keyed by the requesting peer. Each request carries a death
//! registration for its owner, so a client that disappears without
//! releasing loses its request as soon as the transport notices.
//!
//! Locking: every mutation of the request map, and the recomputation of the
//! aggregate `held` state, happens under one mutex. Calls into the death
//! notifier are always made with that mutex released.

use crate::ipc::{DeathNotifier, DeathRegistration, PeerHandle};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;

/// Diagnostic encoding of a request's identifying fields.
pub fn construct_lock_string(tag: &str, package: &str, uid: i32) -> String {
    format!("{},{},{}", tag, package, uid)
}

/// One outstanding wake lock grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub owner: PeerHandle,
    pub tag: String,
    pub package: String,
    pub uid: i32,
    pub acquired_at: DateTime<Utc>,
}

impl Request {
    pub fn lock_string(&self) -> String {
        construct_lock_string(&self.tag, &self.package, self.uid)
    }
}

struct Entry {
    request: Request,
    /// Distinguishes this insertion from earlier ones by the same owner.
    generation: u64,
    registration: DeathRegistration,
}

/// An acquire whose death registration is still being set up.
struct PendingAdd {
    generation: u64,
    died: bool,
}

#[derive(Default)]
struct RegistryState {
    requests: HashMap<PeerHandle, Entry>,
    pending: HashMap<PeerHandle, PendingAdd>,
    next_generation: u64,
    /// Requests dropped because their owner died.
    reclaimed: u64,
}

pub struct WakeLockRegistry {
    state: Mutex<RegistryState>,
    held_tx: watch::Sender<bool>,
    notifier: Arc<dyn DeathNotifier>,
    weak_self: Weak<WakeLockRegistry>,
}

impl WakeLockRegistry {
    pub fn new(notifier: Arc<dyn DeathNotifier>) -> Arc<Self> {
        let (held_tx, _) = watch::channel(false);
        Arc::new_cyclic(|weak_self| Self {
            state: Mutex::new(RegistryState::default()),
            held_tx,
            notifier,
            weak_self: weak_self.clone(),
        })
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recomputes `held` from the map. Must be called with the state lock
    /// held, after every mutation of `requests`.
    fn publish_held(&self, state: &RegistryState) {
        let held = !state.requests.is_empty();
        let changed = self.held_tx.send_if_modified(|current| {
            if *current == held {
                false
            } else {
                *current = held;
                true
            }
        });
        if changed {
            tracing::info!(
                "Wake lock {}",
                if held { "acquired" } else { "released" }
            );
        }
    }

    /// Records a request for `owner`.
    ///
    /// Returns false, leaving any existing request untouched, if `owner`
    /// already has one outstanding or is already dead.
    pub fn add_request(&self, owner: PeerHandle, tag: &str, package: &str, uid: i32) -> bool {
        let generation = {
            let mut state = self.state();
            if state.requests.contains_key(&owner) || state.pending.contains_key(&owner) {
                tracing::warn!(
                    "Got wake lock request for already-registered peer {} (tag \"{}\")",
                    owner,
                    tag
                );
                return false;
            }
            let generation = state.next_generation;
            state.next_generation += 1;
            state.pending.insert(
                owner,
                PendingAdd {
                    generation,
                    died: false,
                },
            );
            generation
        };

        let weak_self = self.weak_self.clone();
        let registration = self.notifier.register(
            owner,
            Box::new(move || {
                if let Some(registry) = weak_self.upgrade() {
                    registry.on_owner_died(owner, generation);
                }
            }),
        );

        let mut state = self.state();
        let pending = state.pending.remove(&owner);
        let died = !matches!(pending, Some(p) if p.generation == generation && !p.died);

        match registration {
            Some(registration) if !died => {
                state.requests.insert(
                    owner,
                    Entry {
                        request: Request {
                            owner,
                            tag: tag.to_string(),
                            package: package.to_string(),
                            uid,
                            acquired_at: Utc::now(),
                        },
                        generation,
                        registration,
                    },
                );
                self.publish_held(&state);
                drop(state);
                tracing::debug!(
                    "Added wake lock {} for {}",
                    construct_lock_string(tag, package, uid),
                    owner
                );
                true
            }
            Some(registration) => {
                drop(state);
                self.notifier.unregister(&registration);
                tracing::warn!("Peer {} died while acquiring wake lock \"{}\"", owner, tag);
                false
            }
            None => {
                drop(state);
                tracing::warn!(
                    "Rejecting wake lock \"{}\" from already-dead peer {}",
                    tag,
                    owner
                );
                false
            }
        }
    }

    /// Removes the request held by `owner`.
    ///
    /// Returns false if `owner` has no outstanding request.
    pub fn remove_request(&self, owner: PeerHandle) -> bool {
        let registration = {
            let mut state = self.state();
            let Some(entry) = state.requests.remove(&owner) else {
                tracing::warn!("Got release request for unregistered peer {}", owner);
                return false;
            };
            self.publish_held(&state);
            tracing::debug!(
                "Removed wake lock {} for {}",
                entry.request.lock_string(),
                owner
            );
            entry.registration
        };

        self.notifier.unregister(&registration);
        true
    }

    /// Death callback for the insertion identified by `generation`.
    ///
    /// The notification has already fired, so there is nothing to
    /// unregister. Notifications for older insertions are ignored.
    fn on_owner_died(&self, owner: PeerHandle, generation: u64) {
        let mut state = self.state();

        if let Some(pending) = state.pending.get_mut(&owner) {
            if pending.generation == generation {
                pending.died = true;
                return;
            }
        }

        let current = state.requests.get(&owner).map(|entry| entry.generation);
        if current != Some(generation) {
            tracing::debug!("Ignoring stale death notification for {}", owner);
            return;
        }

        if let Some(entry) = state.requests.remove(&owner) {
            state.reclaimed += 1;
            tracing::info!(
                "Peer {} died; dropping wake lock {}",
                owner,
                entry.request.lock_string()
            );
        }
        self.publish_held(&state);
    }

    /// True while at least one request is outstanding.
    pub fn is_held(&self) -> bool {
        *self.held_tx.borrow()
    }

    /// Receiver that observes every change of [`Self::is_held`].
    pub fn subscribe_held(&self) -> watch::Receiver<bool> {
        self.held_tx.subscribe()
    }

    /// Number of requests removed by owner death rather than release.
    pub fn reclaimed_count(&self) -> u64 {
        self.state().reclaimed
    }

    pub fn len(&self) -> usize {
        self.state().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of outstanding requests, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        let mut requests: Vec<Request> = self
            .state()
            .requests
            .values()
            .map(|entry| entry.request.clone())
            .collect();
        requests.sort_by_key(|request| request.acquired_at);
        requests
    }

    /// Lock strings of outstanding requests, oldest first.
    pub fn lock_strings(&self) -> Vec<String> {
        self.requests().iter().map(Request::lock_string).collect()
    }

    pub fn request_for(&self, owner: &PeerHandle) -> Option<Request> {
        self.state()
            .requests
            .get(owner)
            .map(|entry| entry.request.clone())
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
