//! Property-based tests for abandoned WAL classification
//!
//! *For any* population of storage directories:
//! - a directory owned by a live instance is never classified as abandoned
//! - an unowned directory is classified as abandoned exactly when it has
//!   segments and its age strictly exceeds the grace period
//! - a directory whose WAL holds no segments is never classified, no
//!   matter how old the directory is

use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use wal_reaper::cleaner::classify_abandoned;
use wal_reaper::scanner::ScanEntry;
use wal_reaper::ReaperError;

/// Grace period used by every property
const MIN_AGE: Duration = Duration::from_secs(3600);

/// One storage directory under the WAL root, as the engine sees it
#[derive(Debug, Clone)]
struct TestDir {
    /// Whether a live instance owns this directory
    managed: bool,
    /// Whether the WAL holds any segment files
    has_segments: bool,
    /// Seconds since the newest segment was written
    age_secs: u64,
}

impl Arbitrary for TestDir {
    fn arbitrary(g: &mut Gen) -> Self {
        TestDir {
            managed: bool::arbitrary(g),
            has_segments: bool::arbitrary(g),
            // Spread ages on both sides of the one-hour grace period
            age_secs: u64::arbitrary(g) % 7200,
        }
    }
}

/// Build scanner entries, the managed set, a synthetic inspector table, and
/// the model's expected abandoned set for a directory population.
fn build_fixture(
    dirs: &[TestDir],
    now: SystemTime,
) -> (
    Vec<ScanEntry>,
    HashSet<PathBuf>,
    HashMap<PathBuf, (bool, SystemTime)>,
    HashSet<PathBuf>,
) {
    let mut entries = Vec::new();
    let mut managed = HashSet::new();
    let mut inspector = HashMap::new();
    let mut expected = HashSet::new();

    for (i, dir) in dirs.iter().enumerate() {
        let path = PathBuf::from(format!("/wal/dir-{}", i));
        entries.push(ScanEntry::Directory(path.clone()));

        if dir.managed {
            managed.insert(path.clone());
        }

        let mtime = now - Duration::from_secs(dir.age_secs);
        inspector.insert(path.clone(), (dir.has_segments, mtime));

        if !dir.managed && dir.has_segments && Duration::from_secs(dir.age_secs) > MIN_AGE {
            expected.insert(path);
        }
    }

    (entries, managed, inspector, expected)
}

fn run_classification(
    entries: &[ScanEntry],
    managed: &HashSet<PathBuf>,
    inspector: &HashMap<PathBuf, (bool, SystemTime)>,
    now: SystemTime,
) -> HashSet<PathBuf> {
    classify_abandoned(entries, managed, now, MIN_AGE, |path| {
        let (has_segments, mtime) = inspector[path];
        if has_segments {
            Ok(mtime)
        } else {
            Err(ReaperError::NoSegments(path.to_path_buf()))
        }
    })
    .into_iter()
    .map(|candidate| candidate.path)
    .collect()
}

#[quickcheck]
fn prop_classification_matches_model(dirs: Vec<TestDir>) -> bool {
    let now = SystemTime::now();
    let (entries, managed, inspector, expected) = build_fixture(&dirs, now);

    run_classification(&entries, &managed, &inspector, now) == expected
}

#[quickcheck]
fn prop_managed_directories_never_classified(dirs: Vec<TestDir>) -> bool {
    let now = SystemTime::now();
    let (entries, managed, inspector, _) = build_fixture(&dirs, now);

    let abandoned = run_classification(&entries, &managed, &inspector, now);
    abandoned.is_disjoint(&managed)
}

#[quickcheck]
fn prop_segmentless_directories_never_classified(dirs: Vec<TestDir>) -> bool {
    let now = SystemTime::now();

    // Force every WAL empty; nothing may be classified regardless of age
    let dirs: Vec<TestDir> = dirs
        .into_iter()
        .map(|dir| TestDir {
            has_segments: false,
            ..dir
        })
        .collect();

    let (entries, managed, inspector, _) = build_fixture(&dirs, now);
    run_classification(&entries, &managed, &inspector, now).is_empty()
}
