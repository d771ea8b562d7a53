//! WAL Cleaner Module
//!
//! Reconciles the WAL storage directories present on disk against the
//! instances the agent currently manages, and reclaims directories that are
//! both unowned and stale. Classification is separated from deletion so the
//! engine can be exercised without touching live data.

use crate::config::{CleanerConfig, CleanupMode};
use crate::instance::InstanceManager;
use crate::scanner::{self, ScanEntry};
use crate::{wal, ReaperError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// An unowned WAL directory whose newest segment is older than the grace
/// period. Recomputed every pass, never persisted.
#[derive(Debug, Clone)]
pub struct AbandonedWal {
    /// Storage directory eligible for removal
    pub path: PathBuf,
    /// Modification time of the newest segment
    pub last_write: SystemTime,
    /// `now - last_write` at classification time
    pub age: Duration,
}

/// Classify scanned storage directories against a registry snapshot.
///
/// `last_write` supplies the newest-segment mtime for a storage directory.
/// Any inspection failure, including an empty WAL, keeps the directory out
/// of the result: insufficient information means "do not touch". The
/// function performs no mutation; applying a deletion policy to the result
/// is the caller's concern.
pub fn classify_abandoned<F>(
    entries: &[ScanEntry],
    managed: &HashSet<PathBuf>,
    now: SystemTime,
    min_age: Duration,
    last_write: F,
) -> Vec<AbandonedWal>
where
    F: Fn(&Path) -> Result<SystemTime>,
{
    let mut out = Vec::new();

    for dir in scanner::directories(entries) {
        if managed.contains(&dir) {
            debug!("active WAL: name={:?}", dir);
            continue;
        }

        let mtime = match last_write(&dir) {
            Ok(mtime) => mtime,
            Err(err) => {
                warn!("unable to find segment mtime of WAL: name={:?}, err={}", dir, err);
                continue;
            }
        };

        // An mtime in the future counts as a fresh write.
        let age = now.duration_since(mtime).unwrap_or_default();
        debug!(
            "unowned WAL: name={:?}, mtime={}, age={:?}",
            dir,
            format_mtime(mtime),
            age
        );

        if age > min_age {
            out.push(AbandonedWal {
                path: dir,
                last_write: mtime,
                age,
            });
        }
    }

    out
}

fn format_mtime(mtime: SystemTime) -> String {
    DateTime::<Utc>::from(mtime).to_rfc3339()
}

/// Background reclaimer for abandoned WAL directories.
///
/// Construction immediately starts the periodic background loop. A single
/// reconciliation pass can also be run synchronously at any time via
/// [`WalCleaner::cleanup_storage`], concurrently with the loop's own
/// passes; passes share no mutable state beyond read-only snapshots.
pub struct WalCleaner {
    manager: Arc<dyn InstanceManager>,
    wal_root: PathBuf,
    min_age: Duration,
    mode: CleanupMode,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WalCleaner {
    /// Create a cleaner and start its periodic background loop.
    ///
    /// The first pass runs one full period after startup. Ticks missed
    /// while a slow pass is running are coalesced, not queued: the loop
    /// runs at most one pass per elapsed period. `config.period` and
    /// `config.min_age` must be non-zero (see [`crate::config::Config::validate`]).
    pub fn new(
        manager: Arc<dyn InstanceManager>,
        wal_root: PathBuf,
        config: CleanerConfig,
    ) -> Arc<Self> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let cleaner = Arc::new(Self {
            manager,
            wal_root,
            min_age: config.min_age,
            mode: config.mode,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            task: Mutex::new(None),
        });

        let loop_cleaner = cleaner.clone();
        let period = config.period;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The interval's first tick completes immediately; consume it so
            // the loop waits a full period before its first pass.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("WAL cleaner shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(err) = loop_cleaner.cleanup_storage().await {
                            error!("WAL cleanup failed: {}", err);
                        }
                    }
                }
            }
        });

        *cleaner.task.lock().unwrap() = Some(task);
        cleaner
    }

    /// Compute the abandoned candidates for one pass at time `now`.
    ///
    /// Fails only when the WAL root itself is unreadable; all per-directory
    /// problems are absorbed as skips.
    pub fn abandoned_storage(&self, now: SystemTime) -> Result<Vec<AbandonedWal>> {
        let instances = self.manager.list_instances();
        let managed: HashSet<PathBuf> = instances
            .values()
            .map(|instance| instance.storage_directory())
            .collect();

        let entries = scanner::scan_wal_root(&self.wal_root)?;
        Ok(classify_abandoned(
            &entries,
            &managed,
            now,
            self.min_age,
            wal::last_write_time,
        ))
    }

    /// Run one reconciliation pass and apply the configured cleanup action.
    ///
    /// Every candidate is attempted even after a failure; only the first
    /// deletion error is returned. Deleting a directory that is already
    /// gone is success, so concurrent passes stay idempotent. Remains
    /// usable after [`WalCleaner::stop`]; stopping only halts the loop.
    pub async fn cleanup_storage(&self) -> Result<()> {
        let abandoned = self.abandoned_storage(SystemTime::now())?;
        let mut first_failure: Option<ReaperError> = None;

        for candidate in abandoned {
            match self.mode {
                CleanupMode::DryRun => {
                    info!(
                        "would delete abandoned WAL: name={:?}, last_write={}, age={:?}",
                        candidate.path,
                        format_mtime(candidate.last_write),
                        candidate.age
                    );
                }
                CleanupMode::Delete => match tokio::fs::remove_dir_all(&candidate.path).await {
                    Ok(()) => {
                        info!(
                            "deleted abandoned WAL: name={:?}, age={:?}",
                            candidate.path, candidate.age
                        );
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        debug!("abandoned WAL already removed: name={:?}", candidate.path);
                    }
                    Err(err) => {
                        warn!(
                            "failed to delete abandoned WAL: name={:?}, err={}",
                            candidate.path, err
                        );
                        if first_failure.is_none() {
                            first_failure = Some(ReaperError::Cleanup(format!(
                                "failed to delete {}: {}",
                                candidate.path.display(),
                                err
                            )));
                        }
                    }
                },
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Stop the background loop.
    ///
    /// Returns only after the loop task has terminated, so no further pass
    /// begins once this call completes. Calling `stop` a second time is a
    /// no-op.
    pub async fn stop(&self) {
        let shutdown_tx = self.shutdown_tx.lock().unwrap().take();
        let Some(shutdown_tx) = shutdown_tx else {
            debug!("cleaner already stopped");
            return;
        };

        debug!("stopping cleaner...");
        let _ = shutdown_tx.send(()).await;

        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!("cleaner task terminated abnormally: {}", err);
            }
        }
    }
}
