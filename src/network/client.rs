//! Blocking client
//!
//! One request at a time over a single TCP connection.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{LogKvError, Result};
use crate::protocol::{read_response, write_command, Command, Response, Status};

/// Client for a LogKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| LogKvError::Network(format!("Failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a raw command and return the raw response
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Fetch a value; `KeyNotFound` when the server has no such key
    pub fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        let response = self.send(&Command::Get { key: key.to_vec() })?;
        expect_ok(response).map(Option::unwrap_or_default)
    }

    /// Store a value
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let response = self.send(&Command::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        expect_ok(response).map(|_| ())
    }

    /// Trigger compaction on the server
    pub fn compact(&mut self) -> Result<()> {
        expect_ok(self.send(&Command::Compact)?).map(|_| ())
    }

    /// Size of the server's active segment
    pub fn size(&mut self) -> Result<u64> {
        let payload = expect_ok(self.send(&Command::Size)?)?.unwrap_or_default();
        let bytes: [u8; 8] = payload.as_slice().try_into().map_err(|_| {
            LogKvError::Protocol(format!("SIZE response: expected 8 bytes, got {}", payload.len()))
        })?;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        expect_ok(self.send(&Command::Ping)?).map(|_| ())
    }
}

fn expect_ok(response: Response) -> Result<Option<Vec<u8>>> {
    let status = response.status;
    if status == Status::Ok {
        return Ok(response.payload);
    }

    let message = response
        .payload
        .map(|p| String::from_utf8_lossy(&p).into_owned())
        .unwrap_or_default();

    match status {
        Status::NotFound => Err(LogKvError::KeyNotFound),
        Status::BadRequest => Err(LogKvError::Protocol(message)),
        _ => Err(LogKvError::Network(message)),
    }
}
