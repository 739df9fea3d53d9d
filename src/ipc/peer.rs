//! Peer identity for objects that cross an RPC connection.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one connection as seen from this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Objects living in this process, not yet sent anywhere.
    pub const LOCAL: ConnectionId = ConnectionId(0);

    /// Allocates a fresh id for a newly accepted or dialed connection.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ConnectionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn is_local(&self) -> bool {
        *self == Self::LOCAL
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Opaque handle for one endpoint object.
///
/// Equality, hashing and liveness (via a death notifier) are the only
/// things callers should rely on. A handle minted locally is rebound to
/// the inbound connection when it arrives at a remote process, so the same
/// object number on two connections yields two distinct handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerHandle {
    connection: ConnectionId,
    object: u64,
}

/// Object number reserved for the root service object of a connection.
const ROOT_OBJECT: u64 = 0;

impl PeerHandle {
    /// Mints a handle for a new object owned by this process.
    pub fn new_local() -> Self {
        static NEXT_OBJECT: AtomicU64 = AtomicU64::new(ROOT_OBJECT + 1);
        Self {
            connection: ConnectionId::LOCAL,
            object: NEXT_OBJECT.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Handle for the service object at the far end of `connection`.
    pub fn root_of(connection: ConnectionId) -> Self {
        Self {
            connection,
            object: ROOT_OBJECT,
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn is_local(&self) -> bool {
        self.connection.is_local()
    }

    /// Rebinds a handle to the connection it arrived on.
    ///
    /// A sender can only name objects it owns: whatever connection the
    /// handle claimed is replaced by the one it was received on.
    pub(crate) fn adopted_from(self, connection: ConnectionId) -> Self {
        Self {
            connection,
            object: self.object,
        }
    }
}

impl std::fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/obj#{}", self.connection, self.object)
    }
}
