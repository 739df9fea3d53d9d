//! The arbiter process: serves the power manager and registers it by name.

use crate::config::PowerdConfig;
use crate::ipc::{serve_binder, PeerDeathNotifier, ServiceDirectory};
use crate::paths;
use crate::power::dispatch::PowerManagerBinder;
use crate::power::manager::PowerManagerService;
use crate::power::property::{FilePropertySetter, PropertySetter};
use crate::power::registry::WakeLockRegistry;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Arbiter state shared by every connection.
pub struct Arbiter {
    notifier: Arc<PeerDeathNotifier>,
    registry: Arc<WakeLockRegistry>,
    binder: Arc<PowerManagerBinder>,
}

impl Arbiter {
    pub fn new(property_setter: Arc<dyn PropertySetter>) -> Self {
        let notifier = Arc::new(PeerDeathNotifier::new());
        let registry = WakeLockRegistry::new(notifier.clone());
        let service = PowerManagerService::new(registry.clone(), property_setter);
        Self {
            notifier,
            registry,
            binder: Arc::new(PowerManagerBinder::new(Arc::new(service))),
        }
    }

    pub fn registry(&self) -> &Arc<WakeLockRegistry> {
        &self.registry
    }

    /// Serves on `addr` under `service_name` until `shutdown_tx` fires.
    ///
    /// Registration happens once the listener is bound; if it fails the
    /// server stops before accepting anything. The registration is removed
    /// again on the way out.
    pub async fn serve(
        &self,
        addr: &str,
        directory: &ServiceDirectory,
        service_name: &str,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Result<()> {
        tracing::info!("Registering with service directory as {}", service_name);
        let result = serve_binder(
            addr,
            self.binder.clone(),
            self.notifier.clone(),
            shutdown_tx,
            |local_addr| {
                directory
                    .add_service(service_name, local_addr)
                    .with_context(|| format!("Failed to register service {}", service_name))?;
                Ok(())
            },
        )
        .await;

        if let Err(e) = directory.remove_service(service_name) {
            tracing::warn!("Failed to deregister {}: {:#}", service_name, e);
        }

        if self.registry.is_held() {
            tracing::info!(
                "Exiting with {} outstanding wake lock(s)",
                self.registry.len()
            );
        }
        result
    }
}

/// Resolves when the process is asked to stop.
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to wait for SIGINT")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for Ctrl-C")?;

    Ok(())
}

/// Runs the arbiter described by `config` until SIGINT or SIGTERM.
pub async fn run_arbiter(config: PowerdConfig) -> Result<()> {
    let home = config.home_dir()?;
    let property_setter = Arc::new(FilePropertySetter::new(paths::properties_dir(&home)?));
    let directory = ServiceDirectory::new(paths::services_dir(&home)?);
    let arbiter = Arbiter::new(property_setter);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => tracing::info!("Shutdown requested"),
            Err(e) => tracing::error!("Signal handling failed, shutting down: {:#}", e),
        }
        let _ = signal_tx.send(());
    });

    arbiter
        .serve(
            &config.listen_addr(),
            &directory,
            &config.service_name,
            shutdown_tx,
        )
        .await
}

#[cfg(test)]
#[path = "tests/daemon_tests.rs"]
mod tests;
