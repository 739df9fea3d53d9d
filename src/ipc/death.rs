//! Death notifications for remote peers.
//!
//! A component interested in a peer's termination registers a callback.
//! The callback runs at most once, on whichever task observes the death,
//! and never while the notifier's own lock is held.

use crate::ipc::{ConnectionId, PeerHandle};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Callback invoked when a peer dies.
pub type DeathCallback = Box<dyn FnOnce() + Send + 'static>;

/// Token for one registration. Unregistering it only affects the
/// registration it was returned for, never a newer one for the same peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeathRegistration {
    peer: PeerHandle,
    id: u64,
}

impl DeathRegistration {
    pub fn peer(&self) -> PeerHandle {
        self.peer
    }
}

pub trait DeathNotifier: Send + Sync {
    /// Registers `on_death` for `peer`.
    ///
    /// Returns `None` if the peer is already known to be dead; the callback
    /// is dropped without running in that case.
    fn register(&self, peer: PeerHandle, on_death: DeathCallback) -> Option<DeathRegistration>;

    /// Cancels a registration. A no-op if it already fired or was removed.
    fn unregister(&self, registration: &DeathRegistration);
}

#[derive(Default)]
struct NotifierState {
    callbacks: HashMap<PeerHandle, Vec<(u64, DeathCallback)>>,
    live_connections: HashSet<ConnectionId>,
    /// Individually dead peers on connections that are still live, plus
    /// dead local objects.
    dead_peers: HashSet<PeerHandle>,
}

impl NotifierState {
    fn is_connection_live(&self, connection: ConnectionId) -> bool {
        connection.is_local() || self.live_connections.contains(&connection)
    }

    fn is_dead(&self, peer: &PeerHandle) -> bool {
        !self.is_connection_live(peer.connection()) || self.dead_peers.contains(peer)
    }
}

/// Notifier driven by the transport: peers die individually or together
/// with the connection they were reached through.
///
/// Only live connections are tracked. Connection ids are never reused, so
/// a remote peer whose connection is not in the live set is dead.
#[derive(Default)]
pub struct PeerDeathNotifier {
    state: Mutex<NotifierState>,
    next_id: AtomicU64,
}

impl PeerDeathNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `connection` live. Must happen before any handle on it is
    /// registered, or the registration is refused as dead.
    pub fn connection_opened(&self, connection: ConnectionId) {
        if !connection.is_local() {
            self.state().live_connections.insert(connection);
        }
    }

    /// Fires every registration for `peer`.
    pub fn notify_peer_died(&self, peer: PeerHandle) {
        let fired = {
            let mut state = self.state();
            if state.is_connection_live(peer.connection()) {
                state.dead_peers.insert(peer);
            }
            state.callbacks.remove(&peer).unwrap_or_default()
        };

        if !fired.is_empty() {
            tracing::debug!("Peer {} died, firing {} callback(s)", peer, fired.len());
        }
        for (_, callback) in fired {
            callback();
        }
    }

    /// Fires every registration for peers reached through `connection`.
    pub fn notify_connection_closed(&self, connection: ConnectionId) {
        let fired: Vec<(PeerHandle, Vec<(u64, DeathCallback)>)> = {
            let mut state = self.state();
            state.live_connections.remove(&connection);
            state
                .dead_peers
                .retain(|peer| peer.connection() != connection);
            let peers: Vec<PeerHandle> = state
                .callbacks
                .keys()
                .filter(|peer| peer.connection() == connection)
                .copied()
                .collect();
            peers
                .into_iter()
                .filter_map(|peer| state.callbacks.remove(&peer).map(|cbs| (peer, cbs)))
                .collect()
        };

        tracing::debug!(
            "Connection {} closed, {} peer(s) affected",
            connection,
            fired.len()
        );
        for (_, callbacks) in fired {
            for (_, callback) in callbacks {
                callback();
            }
        }
    }

    /// True unless `connection` is local or currently open.
    pub fn is_connection_closed(&self, connection: ConnectionId) -> bool {
        !self.state().is_connection_live(connection)
    }

    /// Number of live registrations for `peer`.
    pub fn registration_count(&self, peer: &PeerHandle) -> usize {
        self.state().callbacks.get(peer).map_or(0, Vec::len)
    }
}

impl DeathNotifier for PeerDeathNotifier {
    fn register(&self, peer: PeerHandle, on_death: DeathCallback) -> Option<DeathRegistration> {
        let mut state = self.state();
        if state.is_dead(&peer) {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        state.callbacks.entry(peer).or_default().push((id, on_death));
        Some(DeathRegistration { peer, id })
    }

    fn unregister(&self, registration: &DeathRegistration) {
        let mut state = self.state();
        if let Some(callbacks) = state.callbacks.get_mut(&registration.peer) {
            callbacks.retain(|(id, _)| *id != registration.id);
            if callbacks.is_empty() {
                state.callbacks.remove(&registration.peer);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/death_tests.rs"]
mod tests;
