//! Segment reads
//!
//! Positioned reads of single records and sequential scans of whole files.
//! Closed segments never change, so readers open them freely without locks.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{LogKvError, Result};
use crate::record::{decode_from, Decoded, Entry};

/// Read the record starting at `offset` in the file at `path`
pub fn read_entry_at(path: &Path, offset: u64) -> Result<Entry> {
    SegmentReader::open(path)?.read_at(offset)
}

/// Random-access reader over one segment file
pub struct SegmentReader {
    path: PathBuf,
    reader: BufReader<File>,
}

impl SegmentReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }

    /// Decode the record at `offset`
    pub fn read_at(&mut self, offset: u64) -> Result<Entry> {
        self.reader.seek(SeekFrom::Start(offset))?;
        match decode_from(&mut self.reader)? {
            Decoded::Entry { entry, .. } => Ok(entry),
            Decoded::Eof => Err(LogKvError::Corruption(format!(
                "no record at offset {} in {}",
                offset,
                self.path.display()
            ))),
        }
    }
}

/// Sequential reader yielding every record with its offset
pub struct SegmentScanner {
    reader: BufReader<File>,
    offset: u64,
}

impl SegmentScanner {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            offset: 0,
        })
    }

    /// Offset just past the last record returned
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next `(offset, entry)`, or `None` at a clean end of file
    pub fn next_record(&mut self) -> Result<Option<(u64, Entry)>> {
        match decode_from(&mut self.reader)? {
            Decoded::Entry { entry, len } => {
                let at = self.offset;
                self.offset += len;
                Ok(Some((at, entry)))
            }
            Decoded::Eof => Ok(None),
        }
    }
}
