//! Compactor
//!
//! Merges every closed segment into one, keeping only the records the index
//! still points at. Runs with the writer paused, so the set of closed
//! segments cannot change underneath it.
//!
//! Steps:
//! 1. Pause the writer (queued puts drain first)
//! 2. Enumerate closed segments
//! 3. Snapshot keys whose latest record is in a closed segment
//! 4. Copy those records into a scratch file, noting new offsets
//! 5. Sync and rename the scratch file to a merged segment name
//! 6. Redirect the copied keys to the merged segment
//! 7. Delete the old closed segments (best-effort)
//! 8. Resume the writer
//!
//! Any failure before step 6 removes the scratch file and leaves segments
//! and index as they were.

use std::collections::hash_map::{Entry as MapEntry, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};

use crate::error::{LogKvError, Result};
use crate::index::Location;
use crate::segment::{
    self, compaction_temp_name, merged_segment_name, sync_dir, unique_name, SegmentFile,
    SegmentId, SegmentReader,
};

use super::writer::WriteRequest;
use super::Shared;

/// Outcome of one compaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Closed segments consumed
    pub segments_merged: usize,

    /// Keys copied into the merged segment
    pub keys_retained: usize,

    /// Combined size of the consumed segments
    pub bytes_before: u64,

    /// Size of the merged segment (0 if nothing was retained)
    pub bytes_after: u64,

    /// File name of the merged segment, if one was written
    pub merged_segment: Option<String>,
}

impl CompactionStats {
    /// Space reclaimed in bytes
    pub fn bytes_saved(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

/// Keeps the writer paused; dropping it lets the writer resume
struct PauseGuard {
    _resume: Sender<()>,
}

fn pause_writer(shared: &Shared) -> Result<PauseGuard> {
    let (paused_tx, paused_rx) = bounded(1);
    let (resume_tx, resume_rx) = bounded(1);

    shared.send_write(WriteRequest::Pause {
        paused: paused_tx,
        resume: resume_rx,
    })?;
    paused_rx.recv().map_err(|_| LogKvError::Closed)?;

    Ok(PauseGuard { _resume: resume_tx })
}

/// Run one compaction
pub(crate) fn compact(shared: &Shared) -> Result<CompactionStats> {
    let _gate = shared.compaction_gate.lock();
    let _paused = pause_writer(shared)?;

    let closed = segment::list_closed(&shared.dir)?;
    if closed.is_empty() {
        tracing::debug!("Compaction skipped: no closed segments");
        return Ok(CompactionStats::default());
    }

    let mut stats = CompactionStats {
        segments_merged: closed.len(),
        bytes_before: closed.iter().map(|s| s.len).sum(),
        ..CompactionStats::default()
    };

    let mut live = shared.index.closed_entries();
    live.sort_by(|a, b| {
        a.1.segment
            .cmp(&b.1.segment)
            .then_with(|| a.1.offset.cmp(&b.1.offset))
    });

    if !live.is_empty() {
        let merged = write_merged(&shared.dir, &live)?;
        stats.keys_retained = live.len();
        stats.bytes_after = merged.len;

        let merged_id = SegmentId::closed(merged.name.clone());
        let updates = live
            .into_iter()
            .zip(merged.offsets)
            .map(|((key, old), offset)| (key, old, Location::new(merged_id.clone(), offset)))
            .collect();
        let redirected = shared.index.redirect(updates);
        tracing::debug!("Redirected {} keys to {}", redirected, merged_id);

        stats.merged_segment = Some(merged.name);
    }

    remove_segments(&closed);

    tracing::info!(
        "Compaction merged {} segments: {} keys kept, {} -> {} bytes",
        stats.segments_merged,
        stats.keys_retained,
        stats.bytes_before,
        stats.bytes_after
    );
    Ok(stats)
}

struct MergedSegment {
    name: String,
    offsets: Vec<u64>,
    len: u64,
}

/// Copy the live records into a new merged segment
fn write_merged(dir: &Path, live: &[(Vec<u8>, Location)]) -> Result<MergedSegment> {
    let temp_path = dir.join(unique_name(dir, compaction_temp_name));

    let (offsets, len) = match copy_records(dir, live, &temp_path) {
        Ok(written) => written,
        Err(e) => {
            discard(&temp_path);
            return Err(e);
        }
    };

    let name = unique_name(dir, merged_segment_name);
    if let Err(e) = fs::rename(&temp_path, dir.join(&name)) {
        discard(&temp_path);
        return Err(e.into());
    }
    sync_dir(dir);

    Ok(MergedSegment { name, offsets, len })
}

fn copy_records(
    dir: &Path,
    live: &[(Vec<u8>, Location)],
    temp_path: &Path,
) -> Result<(Vec<u64>, u64)> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    let mut out = BufWriter::new(file);

    let mut readers: HashMap<SegmentId, SegmentReader> = HashMap::new();
    let mut offsets = Vec::with_capacity(live.len());
    let mut offset = 0u64;

    for (key, location) in live {
        let reader = match readers.entry(location.segment.clone()) {
            MapEntry::Occupied(slot) => slot.into_mut(),
            MapEntry::Vacant(slot) => {
                slot.insert(SegmentReader::open(&location.segment.path_in(dir))?)
            }
        };

        let entry = reader.read_at(location.offset)?;
        if entry.key != *key {
            return Err(LogKvError::Corruption(format!(
                "record at {}@{} belongs to a different key",
                location.segment, location.offset
            )));
        }

        let data = entry.encode();
        out.write_all(&data)?;
        offsets.push(offset);
        offset += data.len() as u64;
    }

    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok((offsets, offset))
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Delete consumed segments; failures leave unreachable files behind
fn remove_segments(segments: &[SegmentFile]) {
    for segment in segments {
        if let Err(e) = fs::remove_file(&segment.path) {
            tracing::warn!("Failed to delete compacted segment {}: {}", segment.id, e);
        }
    }
}

/// Periodic compaction in a background thread
pub(crate) struct BackgroundCompactor {
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

impl BackgroundCompactor {
    pub(crate) fn spawn(shared: Arc<Shared>, interval: Duration) -> std::io::Result<Self> {
        let (shutdown, shutdown_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("logkv-compactor".to_string())
            .spawn(move || loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => run_if_due(&shared),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self { shutdown, handle })
    }

    /// Stop the thread, waiting for a running compaction to finish
    pub(crate) fn stop(self) {
        drop(self.shutdown);
        if self.handle.join().is_err() {
            tracing::warn!("Background compactor panicked");
        }
    }
}

fn run_if_due(shared: &Shared) {
    let closed = match segment::list_closed(&shared.dir) {
        Ok(closed) => closed.len(),
        Err(e) => {
            tracing::warn!("Background compaction could not list segments: {}", e);
            return;
        }
    };
    if closed < shared.config.compaction_min_segments.max(1) {
        return;
    }

    if let Err(e) = compact(shared) {
        tracing::warn!("Background compaction failed: {}", e);
    }
}
