//! In-process `ServiceManager` for tests.
//!
//! Services are plain binder objects in this process; death is triggered by
//! hand with [`StubServiceManager::notify_death`].

use crate::ipc::{
    BinderObject, ConnectionId, DeathNotifier, PeerDeathNotifier, PeerHandle, ServiceHandle,
    ServiceManager,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct StubServiceManager {
    services: Mutex<HashMap<String, ServiceHandle>>,
    local_peers: Mutex<Vec<PeerHandle>>,
    notifier: Arc<PeerDeathNotifier>,
}

impl StubServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `binder` under `name` and returns the peer handle clients
    /// will see for it.
    pub fn set_service(&self, name: &str, binder: Arc<dyn BinderObject>) -> PeerHandle {
        let connection = ConnectionId::next();
        self.notifier.connection_opened(connection);
        let peer = PeerHandle::root_of(connection);
        self.services
            .lock()
            .unwrap()
            .insert(name.to_string(), ServiceHandle { peer, binder });
        peer
    }

    /// Every handle minted through `create_local_peer`, in order.
    pub fn local_peers(&self) -> Vec<PeerHandle> {
        self.local_peers.lock().unwrap().clone()
    }

    /// Fires death notifications registered for `peer`.
    pub fn notify_death(&self, peer: PeerHandle) {
        self.notifier.notify_peer_died(peer);
    }

    pub fn notifier(&self) -> &PeerDeathNotifier {
        &self.notifier
    }
}

#[async_trait]
impl ServiceManager for StubServiceManager {
    async fn get_service(&self, name: &str) -> Option<ServiceHandle> {
        self.services.lock().unwrap().get(name).cloned()
    }

    fn death_notifier(&self) -> Arc<dyn DeathNotifier> {
        self.notifier.clone()
    }

    fn create_local_peer(&self) -> PeerHandle {
        let peer = PeerHandle::new_local();
        self.local_peers.lock().unwrap().push(peer);
        peer
    }
}
