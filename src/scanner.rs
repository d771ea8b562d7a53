//! Storage Directory Scanner
//!
//! Walks the WAL root exactly one level deep and reports every immediate
//! child as either a storage directory or a skipped entry. Per-entry
//! problems never abort the walk; only an unreadable root fails the scan.

use crate::{ReaperError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Outcome of scanning a single entry under the WAL root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEntry {
    /// An immediate subdirectory of the WAL root
    Directory(PathBuf),
    /// An entry excluded from the scan, with the reason it was skipped
    Skipped { path: PathBuf, reason: String },
}

/// List the immediate children of the WAL root.
///
/// A problem with an individual entry is logged as a warning and reported
/// as [`ScanEntry::Skipped`]; it never terminates the scan. A WAL with bad
/// permissions may go uncleaned, which beats preventing all other WALs from
/// being cleaned up. Only an error on the root itself fails the whole scan.
pub fn scan_wal_root(root: &Path) -> Result<Vec<ScanEntry>> {
    let mut out = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    out.push(ScanEntry::Directory(entry.into_path()));
                } else {
                    let path = entry.into_path();
                    warn!("skipping non-directory entry under WAL root: path={:?}", path);
                    out.push(ScanEntry::Skipped {
                        path,
                        reason: "not a directory".to_string(),
                    });
                }
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                if path == root {
                    return Err(ReaperError::WalRootUnreadable {
                        path,
                        reason: err.to_string(),
                    });
                }
                warn!("unable to traverse WAL storage path: path={:?}, err={}", path, err);
                out.push(ScanEntry::Skipped {
                    path,
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(out)
}

/// Collect the scanned storage directories into a set for reconciliation
pub fn directories(entries: &[ScanEntry]) -> HashSet<PathBuf> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            ScanEntry::Directory(path) => Some(path.clone()),
            ScanEntry::Skipped { .. } => None,
        })
        .collect()
}
