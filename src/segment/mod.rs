//! Segment Module
//!
//! On-disk segment files: naming, discovery, the active segment and reads.
//!
//! ## Responsibilities
//! - Name closed segments so they sort by creation time
//! - Enumerate segments for recovery and compaction
//! - Append to the active segment and rotate it once full
//! - Positioned reads and sequential scans of any segment
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── current-data                   active segment (append only)
//!   ├── segment-1718000000000000000.seg closed by rotation
//!   ├── segment-1718000500000000000-merged.seg
//!   └── compact-<nanos>.seg            compaction scratch (never replayed)
//! ```

mod active;
mod reader;

pub use active::ActiveSegment;
pub use reader::{read_entry_at, SegmentReader, SegmentScanner};

use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// File name of the active segment
pub const ACTIVE_FILE_NAME: &str = "current-data";

/// Prefix shared by every closed segment
pub const CLOSED_PREFIX: &str = "segment-";

/// Suffix shared by every closed segment
pub const CLOSED_SUFFIX: &str = ".seg";

/// Marker inserted before the suffix of compaction output
pub const MERGED_MARKER: &str = "-merged";

/// Prefix of compaction scratch files
pub const COMPACT_PREFIX: &str = "compact-";

/// Identity of a segment file
///
/// The active segment is identified by role rather than by name: its file is
/// renamed on rotation, and every location pointing at it is retargeted to
/// the closed name in the same step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentId {
    /// The segment currently open for appends
    Active,

    /// An immutable segment, by file name
    Closed(Arc<str>),
}

impl SegmentId {
    pub fn closed(name: impl Into<Arc<str>>) -> Self {
        SegmentId::Closed(name.into())
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SegmentId::Active)
    }

    /// File name within the data directory
    pub fn file_name(&self) -> &str {
        match self {
            SegmentId::Active => ACTIVE_FILE_NAME,
            SegmentId::Closed(name) => name,
        }
    }

    /// Full path within `dir`
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A segment found on disk
#[derive(Debug, Clone)]
pub struct SegmentFile {
    pub id: SegmentId,
    pub path: PathBuf,
    pub len: u64,
    pub modified: SystemTime,
}

/// True for `segment-*.seg`
pub fn is_closed_segment_name(name: &str) -> bool {
    name.len() > CLOSED_PREFIX.len() + CLOSED_SUFFIX.len()
        && name.starts_with(CLOSED_PREFIX)
        && name.ends_with(CLOSED_SUFFIX)
}

/// True for leftover compaction scratch files
pub fn is_compaction_temp_name(name: &str) -> bool {
    name.starts_with(COMPACT_PREFIX) && name.ends_with(CLOSED_SUFFIX)
}

/// "segment-<nanos>.seg"
pub fn closed_segment_name(nanos: u128) -> String {
    format!("{}{}{}", CLOSED_PREFIX, nanos, CLOSED_SUFFIX)
}

/// "segment-<nanos>-merged.seg"
pub fn merged_segment_name(nanos: u128) -> String {
    format!("{}{}{}{}", CLOSED_PREFIX, nanos, MERGED_MARKER, CLOSED_SUFFIX)
}

/// "compact-<nanos>.seg"
pub fn compaction_temp_name(nanos: u128) -> String {
    format!("{}{}{}", COMPACT_PREFIX, nanos, CLOSED_SUFFIX)
}

/// Nanoseconds since the unix epoch
pub fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

/// Pick a timestamped name in `dir` that does not exist yet
pub fn unique_name(dir: &Path, make_name: impl Fn(u128) -> String) -> String {
    let mut nanos = now_nanos();
    loop {
        let name = make_name(nanos);
        if !dir.join(&name).exists() {
            return name;
        }
        nanos += 1;
    }
}

/// Closed segment files in `dir`, oldest name first
pub fn list_closed(dir: &Path) -> Result<Vec<SegmentFile>> {
    let mut segments: Vec<SegmentFile> = list_segments(dir)?
        .into_iter()
        .filter(|s| !s.id.is_active())
        .collect();
    segments.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(segments)
}

/// Every segment in replay order
///
/// Ordered by modification time; on ties the active segment goes last and
/// closed segments fall back to name order.
pub fn list_for_recovery(dir: &Path) -> Result<Vec<SegmentFile>> {
    let mut segments = list_segments(dir)?;
    segments.sort_by(replay_order);
    Ok(segments)
}

fn replay_order(a: &SegmentFile, b: &SegmentFile) -> Ordering {
    a.modified
        .cmp(&b.modified)
        .then_with(|| a.id.is_active().cmp(&b.id.is_active()))
        .then_with(|| a.id.cmp(&b.id))
}

fn list_segments(dir: &Path) -> Result<Vec<SegmentFile>> {
    let mut segments = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        let id = if name == ACTIVE_FILE_NAME {
            SegmentId::Active
        } else if is_closed_segment_name(name) {
            SegmentId::closed(name)
        } else {
            continue;
        };

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        segments.push(SegmentFile {
            id,
            path: entry.path(),
            len: metadata.len(),
            modified: metadata.modified()?,
        });
    }

    Ok(segments)
}

/// Remove leftover compaction scratch files (best-effort)
pub fn remove_compaction_leftovers(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_str().is_some_and(is_compaction_temp_name) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to remove stale {:?}: {}", name, e),
        }
    }
    Ok(removed)
}

/// Persist directory entries after a rename (best-effort)
#[cfg(unix)]
pub fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::warn!("Failed to sync directory {}: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
pub fn sync_dir(_dir: &Path) {}
