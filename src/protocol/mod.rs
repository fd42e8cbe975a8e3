//! Protocol Module
//!
//! Defines the wire protocol between the database server and its clients.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: GET     - Payload: key_len (4) + key
//! - 0x02: PUT     - Payload: key_len (4) + key + value
//! - 0x03: COMPACT - Payload: empty
//! - 0x04: SIZE    - Payload: empty
//! - 0x05: PING    - Payload: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK          (HTTP 200)
//! - 0x01: NOT_FOUND   (HTTP 404)
//! - 0x02: BAD_REQUEST (HTTP 400)
//! - 0x03: ERROR       (HTTP 500)

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
