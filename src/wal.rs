//! WAL Layout Module
//!
//! Read-only helpers over the on-disk write-ahead-log layout used by
//! ingestion instances: `<storage>/wal/<segment files>`, where segments
//! carry zero-padded, monotonically increasing numeric names. Nothing in
//! this module mutates a WAL; a log that is still being written to is safe
//! to inspect.

use crate::{ReaperError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

/// Width of the zero-padded segment file names written by the WAL writer
const SEGMENT_NAME_WIDTH: usize = 8;

/// The WAL subdirectory of an instance storage directory
pub fn sub_directory(storage: &Path) -> PathBuf {
    storage.join("wal")
}

/// Full path of the segment with the given index inside a WAL directory
pub fn segment_name(wal_dir: &Path, index: u64) -> PathBuf {
    wal_dir.join(format!("{:0width$}", index, width = SEGMENT_NAME_WIDTH))
}

/// Parse a directory entry name as a segment index.
///
/// Checkpoint directories, lock files and temp files are not segments and
/// yield `None`.
fn parse_segment_index(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// Highest segment index present in a WAL directory.
///
/// Returns [`ReaperError::NoSegments`] when the directory holds no segment
/// files at all, so callers can tell an empty or corrupt WAL apart from a
/// genuinely fresh one.
pub fn last_segment_index(wal_dir: &Path) -> Result<u64> {
    let mut last: Option<u64> = None;

    for entry in fs::read_dir(wal_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(parse_segment_index) {
            last = Some(last.map_or(index, |cur| cur.max(index)));
        }
    }

    last.ok_or_else(|| ReaperError::NoSegments(wal_dir.to_path_buf()))
}

/// Modification time of the most recently written segment under a storage
/// directory.
///
/// The directory handle and segment metadata are scoped to this call and
/// released on every exit path.
pub fn last_write_time(storage: &Path) -> Result<SystemTime> {
    let wal_dir = sub_directory(storage);
    let last = last_segment_index(&wal_dir)?;

    let segment = segment_name(&wal_dir, last);
    let metadata = fs::metadata(&segment)?;
    let mtime = metadata.modified()?;

    trace!("newest WAL segment: path={:?}, index={}", segment, last);
    Ok(mtime)
}
