use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use wal_reaper::cleaner::WalCleaner;
use wal_reaper::config::Config;
use wal_reaper::instance::BasicInstanceManager;
use wal_reaper::{logging, ReaperError, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.logging)?;

    info!(
        "starting wal-reaper {} (built {})",
        env!("BUILD_VERSION"),
        env!("BUILD_TIMESTAMP")
    );
    info!(
        "WAL root: {:?}, min_age={:?}, period={:?}, mode={:?}",
        config.wal_root, config.cleaner.min_age, config.cleaner.period, config.cleaner.mode
    );

    let registry = Arc::new(BasicInstanceManager::new(config.wal_root.clone()));
    for instance in &config.instances {
        registry.create_instance(&instance.name);
    }

    let cleaner = WalCleaner::new(registry, config.wal_root.clone(), config.cleaner.clone());

    if config.clean_on_start {
        if let Err(err) = cleaner.cleanup_storage().await {
            error!("startup cleanup pass failed: {}", err);
        }
    }

    wait_for_shutdown().await?;

    cleaner.stop().await;
    info!("wal-reaper stopped");
    Ok(())
}

/// Block until SIGINT or SIGTERM arrives
async fn wait_for_shutdown() -> Result<()> {
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .map_err(|e| ReaperError::Io(format!("failed to create SIGINT handler: {}", e)))?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .map_err(|e| ReaperError::Io(format!("failed to create SIGTERM handler: {}", e)))?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
    }

    Ok(())
}
