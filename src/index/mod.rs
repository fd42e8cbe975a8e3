//! Index Module
//!
//! In-memory map from key to the location of its latest record.
//!
//! ## Responsibilities
//! - Point lookups for the read pool (shared lock)
//! - Updates from the writer and the compactor (exclusive lock)
//! - Retargeting active-segment locations when the active file is rotated
//!
//! The lock is only ever held for the in-memory operation itself, never
//! across reads or writes of segment data. The single exception is the
//! rename of the active file during rotation (see `Index::rotate_active`).

mod table;

pub use table::Index;

use crate::segment::SegmentId;

/// Position of one encoded record: which segment, and where in it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub segment: SegmentId,
    pub offset: u64,
}

impl Location {
    pub fn new(segment: SegmentId, offset: u64) -> Self {
        Self { segment, offset }
    }

    /// Location inside the active segment
    pub fn active(offset: u64) -> Self {
        Self::new(SegmentId::Active, offset)
    }

    pub fn is_active(&self) -> bool {
        self.segment.is_active()
    }
}
