//! Instance Registry Module
//!
//! The boundary between the reaper and the agent that owns ingestion
//! instances. The cleaner only ever takes point-in-time snapshots of the
//! registry; it never mutates it. Registry changes concurrent with a
//! reconciliation pass are legal: the minAge grace period protects
//! freshly-created instances whose registry entry has not propagated yet.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// A single ingestion instance managed by the agent
pub trait ManagedInstance: Send + Sync {
    /// Directory holding this instance's WAL storage
    fn storage_directory(&self) -> PathBuf;
}

/// Read-only view of the population of managed instances
pub trait InstanceManager: Send + Sync {
    /// Snapshot of the instances currently alive, keyed by instance name.
    ///
    /// The snapshot is immutable for the duration of one reconciliation
    /// pass; no lock is held against concurrent instance churn.
    fn list_instances(&self) -> HashMap<String, Arc<dyn ManagedInstance>>;
}

/// Instance handle backed by a fixed storage directory
#[derive(Debug, Clone)]
pub struct StorageInstance {
    storage_dir: PathBuf,
}

impl StorageInstance {
    pub fn new(storage_dir: PathBuf) -> Self {
        Self { storage_dir }
    }
}

impl ManagedInstance for StorageInstance {
    fn storage_directory(&self) -> PathBuf {
        self.storage_dir.clone()
    }
}

/// In-process instance registry used by the daemon binary and tests.
///
/// Each instance's storage directory is the WAL root joined with its name,
/// matching the layout the WAL writer produces.
pub struct BasicInstanceManager {
    wal_root: PathBuf,
    instances: RwLock<HashMap<String, Arc<dyn ManagedInstance>>>,
}

impl BasicInstanceManager {
    pub fn new(wal_root: PathBuf) -> Self {
        Self {
            wal_root,
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Register an instance and return its storage directory
    pub fn create_instance(&self, name: &str) -> PathBuf {
        let storage_dir = self.wal_root.join(name);
        let instance = Arc::new(StorageInstance::new(storage_dir.clone()));

        let mut instances = self.instances.write().unwrap();
        instances.insert(name.to_string(), instance);
        info!("registered instance: name={}, storage={:?}", name, storage_dir);

        storage_dir
    }

    /// Deregister an instance, returning whether it was present.
    ///
    /// The WAL directory is left on disk; reclaiming it once it exceeds the
    /// grace period is the cleaner's job.
    pub fn remove_instance(&self, name: &str) -> bool {
        let mut instances = self.instances.write().unwrap();
        let removed = instances.remove(name).is_some();
        if removed {
            debug!("deregistered instance: name={}", name);
        }
        removed
    }
}

impl InstanceManager for BasicInstanceManager {
    fn list_instances(&self) -> HashMap<String, Arc<dyn ManagedInstance>> {
        self.instances.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_create_and_remove_instance() {
        let manager = BasicInstanceManager::new(PathBuf::from("/data/wal"));

        let dir = manager.create_instance("inst-1");
        assert_eq!(dir, Path::new("/data/wal/inst-1"));
        assert_eq!(manager.list_instances().len(), 1);

        assert!(manager.remove_instance("inst-1"));
        assert!(!manager.remove_instance("inst-1"));
        assert!(manager.list_instances().is_empty());
    }

    #[test]
    fn test_snapshot_is_independent_of_later_churn() {
        let manager = BasicInstanceManager::new(PathBuf::from("/data/wal"));
        manager.create_instance("inst-1");

        let snapshot = manager.list_instances();
        manager.remove_instance("inst-1");
        manager.create_instance("inst-2");

        // The earlier snapshot still reflects the point in time it was taken
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot["inst-1"].storage_directory(),
            Path::new("/data/wal/inst-1")
        );
    }
}
