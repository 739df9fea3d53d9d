//! Serving a binder object over tarpc.
//!
//! Each accepted connection gets its own `ConnectionId`. Binders arriving on
//! a connection are rebound to it, and when the connection ends (client
//! hang-up or server shutdown) every death registration for peers on that
//! connection fires.

use crate::ipc::service::TransactService;
use crate::ipc::{BinderObject, ConnectionId, Parcel, PeerDeathNotifier, TransactResult};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tarpc::server::{self, Channel};
use tarpc::tokio_serde::formats::Bincode;
use tokio::sync::broadcast;

/// Server half of one connection.
#[derive(Clone)]
struct ConnectionServer {
    object: Arc<dyn BinderObject>,
    connection: ConnectionId,
}

impl TransactService for ConnectionServer {
    async fn transact(
        self,
        _: tarpc::context::Context,
        code: u32,
        mut data: Parcel,
        flags: u32,
    ) -> TransactResult<Parcel> {
        data.adopt_from(self.connection);
        self.object.on_transact(code, data, flags).await
    }
}

/// Serves `object` on `addr` until `shutdown_tx` fires.
///
/// `on_listening` runs once the listener is bound, with the actual local
/// address; an error from it aborts the server before any connection is
/// accepted.
pub async fn serve_binder<F>(
    addr: &str,
    object: Arc<dyn BinderObject>,
    notifier: Arc<PeerDeathNotifier>,
    shutdown_tx: broadcast::Sender<()>,
    on_listening: F,
) -> anyhow::Result<()>
where
    F: FnOnce(SocketAddr) -> anyhow::Result<()>,
{
    use tarpc::serde_transport::tcp;

    let mut listener = tcp::listen(addr, Bincode::default).await?;
    let local_addr = listener.local_addr();
    tracing::info!("Serving {} on {}", object.descriptor(), local_addr);

    // Subscribe before reporting readiness so a shutdown sent right after
    // `on_listening` is not missed.
    let mut shutdown_rx = shutdown_tx.subscribe();
    on_listening(local_addr)?;

    loop {
        tokio::select! {
            Some(result) = listener.next() => {
                match result {
                    Ok(transport) => {
                        let connection = ConnectionId::next();
                        notifier.connection_opened(connection);
                        let server = ConnectionServer {
                            object: object.clone(),
                            connection,
                        };
                        let channel = server::BaseChannel::with_defaults(transport);
                        let notifier = notifier.clone();
                        let mut connection_shutdown = shutdown_tx.subscribe();

                        tracing::debug!("Accepted {}", connection);
                        tokio::spawn(async move {
                            tokio::select! {
                                _ = channel.execute(server.serve()).for_each(|response| async {
                                    tokio::spawn(response);
                                }) => {
                                    tracing::debug!("{} hung up", connection);
                                }
                                _ = connection_shutdown.recv() => {
                                    tracing::debug!("Closing {} for shutdown", connection);
                                }
                            }
                            notifier.notify_connection_closed(connection);
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    tracing::info!("Stopped serving {}", object.descriptor());
    Ok(())
}
