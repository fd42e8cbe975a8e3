//! Active segment
//!
//! The single append-only file that receives new records. Owned exclusively
//! by the write serializer.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{LogKvError, Result};
use crate::index::Index;
use crate::record::Entry;

use super::{closed_segment_name, sync_dir, unique_name, SegmentId, ACTIVE_FILE_NAME};

/// The segment currently open for appends
pub struct ActiveSegment {
    dir: PathBuf,
    path: PathBuf,

    /// None only after a rotation failed to open the replacement file;
    /// the next append reopens it
    file: Option<File>,

    /// Append offset, mirrors the file length
    offset: u64,

    sync_strategy: SyncStrategy,
    unsynced: usize,
}

impl ActiveSegment {
    /// Open or create the active segment in `dir`
    pub fn open(dir: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let path = dir.join(ACTIVE_FILE_NAME);
        let file = open_append(&path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            dir: dir.to_path_buf(),
            path,
            file: Some(file),
            offset,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Current append offset (size of the active file)
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, returning the offset it was written at
    ///
    /// On failure the file is cut back to the previous offset so no torn
    /// record is left behind.
    pub fn append(&mut self, entry: &Entry) -> Result<u64> {
        entry.validate()?;
        let data = entry.encode();
        let position = self.offset;
        let strategy = self.sync_strategy;
        let sync_now = match strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced + 1 >= count.max(1),
        };

        let file = self.file()?;
        let written = file
            .write_all(&data)
            .and_then(|_| if sync_now { file.sync_data() } else { Ok(()) });

        if let Err(e) = written {
            self.roll_back(position);
            return Err(e.into());
        }

        self.unsynced = if sync_now { 0 } else { self.unsynced + 1 };
        self.offset += data.len() as u64;
        Ok(position)
    }

    /// Whether the active segment has reached the rotation threshold
    pub fn is_full(&self, max_segment_size: u64) -> bool {
        self.offset >= max_segment_size
    }

    /// Close the active file under a closed-segment name and start a new one
    ///
    /// The rename and the index retargeting happen as one step under the
    /// index write lock. Returns the identity of the newly closed segment.
    pub fn rotate(&mut self, index: &Index) -> Result<SegmentId> {
        self.sync()?;

        let name = unique_name(&self.dir, closed_segment_name);
        let closed_path = self.dir.join(&name);
        let closed = SegmentId::closed(name);

        let moved = index.rotate_active(closed.clone(), || fs::rename(&self.path, &closed_path))?;
        sync_dir(&self.dir);

        // Drop the old handle before creating the replacement
        self.file = None;
        self.offset = 0;
        self.unsynced = 0;
        self.file = Some(open_append(&self.path)?);

        tracing::debug!("Rotated active segment to {} ({} keys retargeted)", closed, moved);
        Ok(closed)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.sync_all()?;
        }
        self.unsynced = 0;
        Ok(())
    }

    /// Cut the file back to `position` after a failed append
    ///
    /// If that fails too, the handle is dropped: the next append reopens the
    /// file and takes its real length as the offset.
    fn roll_back(&mut self, position: u64) {
        let restored = match self.file.as_mut() {
            Some(file) => file.set_len(position),
            None => Ok(()),
        };

        if let Err(e) = restored {
            tracing::warn!("Failed to roll back active segment to {}: {}", position, e);
            self.file = None;
        }
    }

    /// The open file, reopening it if an earlier rotation or rollback left none
    fn file(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            let file = open_append(&self.path)?;
            self.offset = file.metadata()?.len();
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| LogKvError::Corruption("active segment unavailable".to_string()))
    }
}

#[cfg(test)]
impl ActiveSegment {
    /// Active segment over an already opened handle
    pub(crate) fn with_file(dir: &Path, file: File, sync_strategy: SyncStrategy) -> Result<Self> {
        let offset = file.metadata()?.len();
        Ok(Self {
            dir: dir.to_path_buf(),
            path: dir.join(ACTIVE_FILE_NAME),
            file: Some(file),
            offset,
            sync_strategy,
            unsynced: 0,
        })
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .read(true)
        .open(path)
}
