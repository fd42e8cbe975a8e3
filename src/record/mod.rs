//! Record Module
//!
//! Binary layout of a single key/value entry and stream decoding.
//!
//! ## File Format
//! A segment is a plain concatenation of records, oldest first:
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Record                                                   │
//! │ ┌──────────┬────────────┬─────┬────────────┬───────────┐ │
//! │ │Total (4) │ KeyLen (4) │ Key │ ValLen (4) │   Value   │ │
//! │ └──────────┴────────────┴─────┴────────────┴───────────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Record ...                                               │
//! └──────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian u32. `Total` covers the whole record,
//! header included: `Total = 12 + KeyLen + ValLen`.

mod entry;
mod decoder;

pub use entry::{Entry, HEADER_SIZE, MAX_RECORD_SIZE};
pub use decoder::{decode_from, Decoded};
