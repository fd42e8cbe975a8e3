//! Record decoding
//!
//! Reads records back from a byte stream, telling a clean end of data apart
//! from a record that was cut short or is malformed.

use std::io::{ErrorKind, Read};

use bytes::Buf;

use crate::error::{LogKvError, Result};
use super::entry::{Entry, HEADER_SIZE};

/// Outcome of decoding one record from a stream
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    /// A complete record and the number of bytes it occupied
    Entry { entry: Entry, len: u64 },

    /// No bytes were left: clean end of data
    Eof,
}

/// Decode the next record from `reader`
///
/// Returns:
/// - `Ok(Decoded::Entry { .. })` - a full record was read
/// - `Ok(Decoded::Eof)` - the stream ended exactly on a record boundary
/// - `Err(TruncatedRecord)` - the stream ended partway through a record
/// - `Err(Corruption)` - the length fields are inconsistent
pub fn decode_from<R: Read>(reader: &mut R) -> Result<Decoded> {
    let mut size_buf = [0u8; 4];
    let got = read_full(reader, &mut size_buf)?;
    if got == 0 {
        return Ok(Decoded::Eof);
    }
    if got < size_buf.len() {
        return Err(LogKvError::TruncatedRecord { consumed: got as u64 });
    }

    let total = u32::from_le_bytes(size_buf) as u64;
    if total < HEADER_SIZE as u64 {
        return Err(LogKvError::Corruption(format!(
            "record length {} is smaller than the {} byte header",
            total, HEADER_SIZE
        )));
    }

    // `take` bounds the allocation by what the stream actually holds
    let body_len = total - 4;
    let mut body = Vec::new();
    reader.by_ref().take(body_len).read_to_end(&mut body)?;
    if (body.len() as u64) < body_len {
        return Err(LogKvError::TruncatedRecord {
            consumed: 4 + body.len() as u64,
        });
    }

    let entry = parse_body(&body)?;
    Ok(Decoded::Entry { entry, len: total })
}

/// Split the record body into key and value
fn parse_body(body: &[u8]) -> Result<Entry> {
    let mut buf = body;

    let key_len = buf.get_u32_le() as usize;
    if buf.remaining() < key_len + 4 {
        return Err(LogKvError::Corruption(format!(
            "key length {} overruns record body of {} bytes",
            key_len,
            body.len()
        )));
    }
    let key = buf[..key_len].to_vec();
    buf.advance(key_len);

    let value_len = buf.get_u32_le() as usize;
    if buf.remaining() != value_len {
        return Err(LogKvError::Corruption(format!(
            "value length {} does not match remaining {} bytes",
            value_len,
            buf.remaining()
        )));
    }
    let value = buf.to_vec();

    Ok(Entry { key, value })
}

/// Fill `buf` as far as the stream allows, returning the byte count
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
