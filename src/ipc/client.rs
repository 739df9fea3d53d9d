//! Client side of the transport: resolving services and talking to them.

use crate::ipc::binder::INTERFACE_TRANSACTION;
use crate::ipc::service::TransactServiceClient;
use crate::ipc::{
    BinderObject, ConnectionId, DeathNotifier, Parcel, PeerDeathNotifier, PeerHandle,
    ServiceDirectory, ServiceRecord, Status, TransactResult,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tarpc::client::{self, NewClient};
use tarpc::tokio_serde::formats::Bincode;

/// Maximum connection attempts with exponential backoff.
const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 50;

/// A resolved service: its binder and the peer handle used to watch it.
#[derive(Clone)]
pub struct ServiceHandle {
    pub peer: PeerHandle,
    pub binder: Arc<dyn BinderObject>,
}

/// What a client needs from the transport.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Looks up `name` and returns a handle to it, or `None` if it is not
    /// registered or cannot be reached.
    async fn get_service(&self, name: &str) -> Option<ServiceHandle>;

    /// Notifier that reports the death of peers returned by `get_service`.
    fn death_notifier(&self) -> Arc<dyn DeathNotifier>;

    /// Mints a handle for a new object owned by the caller.
    fn create_local_peer(&self) -> PeerHandle;
}

/// Binder living behind a tarpc connection.
pub struct RemoteBinder {
    client: TransactServiceClient,
    descriptor: String,
}

impl RemoteBinder {
    async fn raw_transact(&self, code: u32, data: Parcel, flags: u32) -> TransactResult<Parcel> {
        match self
            .client
            .transact(tarpc::context::current(), code, data, flags)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("Transaction {} failed in transport: {}", code, e);
                Err(Status::DeadObject)
            }
        }
    }
}

#[async_trait]
impl BinderObject for RemoteBinder {
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    async fn on_transact(&self, code: u32, data: Parcel, flags: u32) -> TransactResult<Parcel> {
        self.raw_transact(code, data, flags).await
    }
}

/// `ServiceManager` backed by the service directory and tarpc over TCP.
///
/// Connections are cached per service name and dropped from the cache once
/// they close, so a restarted arbiter is picked up by the next lookup.
pub struct RpcServiceManager {
    directory: ServiceDirectory,
    notifier: Arc<PeerDeathNotifier>,
    connections: Mutex<HashMap<String, ServiceHandle>>,
}

impl RpcServiceManager {
    pub fn new(directory: ServiceDirectory) -> Self {
        Self {
            directory,
            notifier: Arc::new(PeerDeathNotifier::new()),
            connections: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, name: &str) -> Option<ServiceHandle> {
        let mut connections = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let handle = connections.get(name)?.clone();
        if self.notifier.is_connection_closed(handle.peer.connection()) {
            connections.remove(name);
            return None;
        }
        Some(handle)
    }

    async fn connect(&self, record: &ServiceRecord) -> Result<ServiceHandle> {
        let connection = ConnectionId::next();
        let client = self.connect_with_retry(record, connection).await?;

        let mut binder = RemoteBinder {
            client,
            descriptor: String::new(),
        };
        let mut reply = binder
            .raw_transact(INTERFACE_TRANSACTION, Parcel::new(), 0)
            .await
            .map_err(|status| anyhow::anyhow!("Interface query failed: {}", status))?;
        binder.descriptor = reply
            .read_string()
            .map_err(|status| anyhow::anyhow!("Malformed interface reply: {}", status))?;

        tracing::debug!(
            "Connected to {} ({}) on {}",
            record.name,
            binder.descriptor,
            connection
        );

        Ok(ServiceHandle {
            peer: PeerHandle::root_of(connection),
            binder: Arc::new(binder),
        })
    }

    /// Dials the service, retrying with exponential backoff and jitter.
    ///
    /// The returned client's dispatch runs on its own task; when it ends the
    /// connection is reported closed to the death notifier.
    async fn connect_with_retry(
        &self,
        record: &ServiceRecord,
        connection: ConnectionId,
    ) -> Result<TransactServiceClient> {
        use tarpc::serde_transport::tcp;

        let addr = record.address();
        let mut delay_ms = BASE_DELAY_MS;
        let mut last_error = None;

        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            match tcp::connect(&addr, Bincode::default).await {
                Ok(transport) => {
                    let NewClient { client, dispatch } =
                        TransactServiceClient::new(client::Config::default(), transport);

                    self.notifier.connection_opened(connection);
                    let notifier = self.notifier.clone();
                    tokio::spawn(async move {
                        if let Err(e) = dispatch.await {
                            tracing::debug!("Dispatch for {} ended with error: {}", connection, e);
                        }
                        notifier.notify_connection_closed(connection);
                    });
                    return Ok(client);
                }
                Err(e) => {
                    tracing::debug!("Connect attempt {} to {} failed: {}", attempt, addr, e);
                    last_error = Some(e);
                }
            }

            if attempt < MAX_CONNECT_ATTEMPTS {
                // Add jitter (±25%)
                let jitter = (delay_ms as f64 * 0.25 * (rand::random::<f64>() * 2.0 - 1.0)) as i64;
                let actual_delay = (delay_ms as i64 + jitter).max(10) as u64;
                tokio::time::sleep(Duration::from_millis(actual_delay)).await;
                delay_ms *= 2;
            }
        }

        let error = match last_error {
            Some(e) => anyhow::Error::from(e),
            None => anyhow::anyhow!("Failed to connect after {} attempts", MAX_CONNECT_ATTEMPTS),
        };
        Err(error).with_context(|| format!("Failed to connect to {} at {}", record.name, addr))
    }
}

#[async_trait]
impl ServiceManager for RpcServiceManager {
    async fn get_service(&self, name: &str) -> Option<ServiceHandle> {
        if let Some(handle) = self.cached(name) {
            return Some(handle);
        }

        let record = match self.directory.lookup(name) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::error!("Didn't get {} service: not registered", name);
                return None;
            }
            Err(e) => {
                tracing::error!("Didn't get {} service: {:#}", name, e);
                return None;
            }
        };

        match self.connect(&record).await {
            Ok(handle) => {
                self.connections
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(name.to_string(), handle.clone());
                Some(handle)
            }
            Err(e) => {
                tracing::error!("Didn't get {} service: {:#}", name, e);
                None
            }
        }
    }

    fn death_notifier(&self) -> Arc<dyn DeathNotifier> {
        self.notifier.clone()
    }

    fn create_local_peer(&self) -> PeerHandle {
        PeerHandle::new_local()
    }
}
