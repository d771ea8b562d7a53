//! Logging Module
//!
//! Builds the tracing subscriber for the daemon: a compact console layer,
//! plus an optional daily-rolling file layer when an application log
//! directory is configured.

use crate::config::LoggingConfig;
use crate::{ReaperError, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// The configured log level applies unless RUST_LOG overrides it. Repeated
/// initialization (as happens across tests) is tolerated.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
        .compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    match &config.app_log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                ReaperError::Io(format!(
                    "failed to create app log directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;

            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "wal-reaper.log");
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .compact();

            let _ = registry.with(file_layer).try_init();
        }
        None => {
            let _ = registry.try_init();
        }
    }

    Ok(())
}
