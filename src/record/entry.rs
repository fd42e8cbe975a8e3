//! Record entry definitions
//!
//! Defines the structure and encoding of individual segment records.

use bytes::{BufMut, BytesMut};

use crate::error::{LogKvError, Result};

/// Fixed overhead of one record: total, key length and value length fields
pub const HEADER_SIZE: usize = 12;

/// Largest encodable record (the total length field is a u32)
pub const MAX_RECORD_SIZE: u64 = u32::MAX as u64;

/// A single key/value record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Size of this record once encoded
    pub fn encoded_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.key.len() as u64 + self.value.len() as u64
    }

    /// Check that the record fits the u32 length fields
    pub fn validate(&self) -> Result<()> {
        let len = self.encoded_len();
        if len > MAX_RECORD_SIZE {
            return Err(LogKvError::RecordTooLarge(len));
        }
        Ok(())
    }

    /// Encode to the on-disk layout
    ///
    /// Callers must `validate()` first; oversized lengths would be truncated.
    pub fn encode(&self) -> Vec<u8> {
        let total = self.encoded_len() as usize;
        let mut buf = BytesMut::with_capacity(total);
        buf.put_u32_le(total as u32);
        buf.put_u32_le(self.key.len() as u32);
        buf.put_slice(&self.key);
        buf.put_u32_le(self.value.len() as u32);
        buf.put_slice(&self.value);
        buf.to_vec()
    }
}
