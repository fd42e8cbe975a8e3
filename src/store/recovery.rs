//! Recovery
//!
//! Rebuilds the index at startup by replaying every segment in modification
//! time order. Later files and later records overwrite earlier ones, which is
//! exactly last-write-wins.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{LogKvError, Result};
use crate::index::{Index, Location};
use crate::segment::{list_for_recovery, SegmentFile, SegmentScanner};

/// Summary of one recovery run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Number of segment files replayed
    pub segments_replayed: usize,

    /// Number of records decoded across all segments
    pub entries_replayed: u64,

    /// Number of distinct keys in the rebuilt index
    pub keys: usize,

    /// Bytes of partial trailing record cut from the active segment
    pub truncated_bytes: u64,
}

/// Replay every segment in `dir` into `index`
///
/// A partial record at the end of the active segment is the signature of a
/// write interrupted by a crash. With `strict` it is `Corruption`; otherwise
/// it is cut off and replay continues.
/// Partial records in closed segments and malformed records anywhere are
/// fatal.
pub(crate) fn recover(dir: &Path, index: &Index, strict: bool) -> Result<RecoveryReport> {
    let mut report = RecoveryReport::default();

    for segment in list_for_recovery(dir)? {
        let (entries, truncated) = replay_segment(&segment, index, strict)?;
        report.segments_replayed += 1;
        report.entries_replayed += entries;
        report.truncated_bytes += truncated;
    }

    report.keys = index.len();
    Ok(report)
}

/// Returns (records replayed, bytes truncated)
fn replay_segment(segment: &SegmentFile, index: &Index, strict: bool) -> Result<(u64, u64)> {
    let mut scanner = SegmentScanner::open(&segment.path)?;
    let mut entries = 0;

    loop {
        match scanner.next_record() {
            Ok(Some((offset, entry))) => {
                index.insert(entry.key, Location::new(segment.id.clone(), offset));
                entries += 1;
            }
            Ok(None) => {
                tracing::debug!("Replayed {} records from {}", entries, segment.id);
                return Ok((entries, 0));
            }
            Err(LogKvError::TruncatedRecord { consumed }) => {
                let valid = scanner.offset();
                if strict || !segment.id.is_active() {
                    return Err(LogKvError::Corruption(format!(
                        "corrupted segment {}: partial record of {} bytes at offset {}",
                        segment.path.display(),
                        consumed,
                        valid
                    )));
                }

                let truncated = truncate_tail(segment, valid)?;
                tracing::warn!(
                    "Truncated {} bytes of partial record from {} at offset {}",
                    truncated,
                    segment.id,
                    valid
                );
                return Ok((entries, truncated));
            }
            Err(LogKvError::Corruption(reason)) => {
                return Err(LogKvError::Corruption(format!(
                    "corrupted segment {} after offset {}: {}",
                    segment.path.display(),
                    scanner.offset(),
                    reason
                )));
            }
            Err(e) => return Err(e),
        }
    }
}

fn truncate_tail(segment: &SegmentFile, valid: u64) -> Result<u64> {
    let file = OpenOptions::new().write(true).open(&segment.path)?;
    let len = file.metadata()?.len();
    file.set_len(valid)?;
    file.sync_all()?;
    Ok(len.saturating_sub(valid))
}
