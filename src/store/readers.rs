//! Read Pool
//!
//! Fixed set of workers answering point lookups. Each lookup takes the index
//! read lock only for the map access, then opens the segment file on its own.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender};

use crate::error::{LogKvError, Result};
use crate::index::Location;

use super::Shared;

/// Attempts per lookup when the key's location moves under a read
const MAX_READ_ATTEMPTS: usize = 3;

pub(crate) struct ReadRequest {
    pub(crate) key: Vec<u8>,
    pub(crate) reply: Sender<Result<Vec<u8>>>,
}

/// Start `workers` reader threads sharing one request queue
pub(crate) fn spawn_pool(
    shared: &Arc<Shared>,
    requests: &Receiver<ReadRequest>,
    workers: usize,
) -> std::io::Result<Vec<JoinHandle<()>>> {
    (0..workers)
        .map(|id| {
            let shared = Arc::clone(shared);
            let requests = requests.clone();
            thread::Builder::new()
                .name(format!("logkv-reader-{}", id))
                .spawn(move || {
                    for request in requests.iter() {
                        let result = lookup(&shared, &request.key);
                        let _ = request.reply.send(result);
                    }
                })
        })
        .collect()
}

/// Resolve a key to its latest value
///
/// A read that fails while the key's location changes (rotation renamed the
/// file, compaction moved the record) is retried at the new location.
pub(crate) fn lookup(shared: &Shared, key: &[u8]) -> Result<Vec<u8>> {
    let mut location = shared.index.get(key).ok_or(LogKvError::KeyNotFound)?;
    let mut attempt = 1;

    loop {
        let err = match read_value(shared, &location, key) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match shared.index.get(key) {
            Some(current) if current != location && attempt < MAX_READ_ATTEMPTS => {
                tracing::debug!(
                    "Location of key moved from {}@{} to {}@{}, retrying",
                    location.segment,
                    location.offset,
                    current.segment,
                    current.offset
                );
                location = current;
                attempt += 1;
            }
            _ => return Err(err),
        }
    }
}

fn read_value(shared: &Shared, location: &Location, key: &[u8]) -> Result<Vec<u8>> {
    let path = location.segment.path_in(&shared.dir);
    let entry = crate::segment::read_entry_at(&path, location.offset)?;
    if entry.key != key {
        return Err(LogKvError::Corruption(format!(
            "record at {}@{} belongs to a different key",
            location.segment, location.offset
        )));
    }
    Ok(entry.value)
}
