mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use nativepower::config::PowerdConfig;
use nativepower::ipc::{RpcServiceManager, ServiceDirectory, ServiceManager};
use nativepower::logging::{self, LogTarget};
use nativepower::power::{self, PowerManager, PowerManagerProxy, WakeLock};
use nativepower::{paths, BUILD_SHA};
use std::time::Duration;

fn service_manager(config: &PowerdConfig) -> Result<RpcServiceManager> {
    let home = config.home_dir()?;
    Ok(RpcServiceManager::new(ServiceDirectory::new(
        paths::services_dir(&home)?,
    )))
}

async fn power_manager(config: &PowerdConfig) -> Result<PowerManagerProxy> {
    let service_manager = service_manager(config)?;
    let handle = service_manager
        .get_service(&config.service_name)
        .await
        .with_context(|| format!("Didn't get {} service", config.service_name))?;
    Ok(PowerManagerProxy::new(handle.binder))
}

async fn run_example(config: &PowerdConfig, sleep_sec: u64, tag: &str, package: &str) -> Result<()> {
    let service_manager = service_manager(config)?;

    tracing::info!("Creating wake lock");
    let lock = WakeLock::create_for_service(&service_manager, &config.service_name, tag, package)
        .await
        .context("Failed to create wake lock")?;

    tracing::info!("Sleeping for {} seconds", sleep_sec);
    tokio::time::sleep(Duration::from_secs(sleep_sec)).await;

    tracing::info!("Exiting");
    lock.release().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PowerdConfig::resolve(cli.config.as_deref())?;

    let target = match cli.command {
        Command::Daemon => LogTarget::File(paths::log_path(&config.home_dir()?)?),
        _ => LogTarget::Stderr,
    };
    logging::init(&config.log_level, target)?;

    match cli.command {
        Command::Daemon => {
            tracing::info!("powerd {} starting", BUILD_SHA);
            power::run_arbiter(config).await
        }
        Command::Example {
            sleep_sec,
            tag,
            package,
        } => run_example(&config, sleep_sec, &tag, &package).await,
        Command::Reboot { reason } => {
            let status = power_manager(&config)
                .await?
                .reboot(false, &reason, false)
                .await;
            if !status.is_ok() {
                anyhow::bail!("Reboot request failed: {}", status);
            }
            Ok(())
        }
        Command::Shutdown { reason } => {
            let status = power_manager(&config)
                .await?
                .shutdown(false, &reason, false)
                .await;
            if !status.is_ok() {
                anyhow::bail!("Shutdown request failed: {}", status);
            }
            Ok(())
        }
        Command::Status => {
            let dump = power_manager(&config)
                .await?
                .fetch_dump()
                .await
                .map_err(|status| anyhow::anyhow!("Dump request failed: {}", status))?;
            print!("{}", dump);
            Ok(())
        }
    }
}
