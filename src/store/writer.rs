//! Write Serializer
//!
//! The only writer of the active segment. Requests are processed strictly one
//! at a time in arrival order, so "append + index update + maybe rotate" needs
//! no lock of its own.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender};

use crate::error::Result;
use crate::index::Location;
use crate::record::Entry;
use crate::segment::ActiveSegment;

use super::Shared;

/// State of the write serializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting and applying writes
    Running,

    /// Mid-rotation, still inside one put
    Rotating,

    /// Paused for compaction, or shut down
    Stopped,
}

/// Messages accepted by the writer
pub(crate) enum WriteRequest {
    Put {
        key: Vec<u8>,
        value: Vec<u8>,
        reply: Sender<Result<()>>,
    },

    /// Stop after everything queued ahead of this request, acknowledge on
    /// `paused`, and wait until `resume` is signalled or dropped
    Pause {
        paused: Sender<()>,
        resume: Receiver<()>,
    },
}

pub(crate) struct WriteSerializer {
    segment: ActiveSegment,
    shared: Arc<Shared>,
}

impl WriteSerializer {
    /// Start the writer thread
    ///
    /// The thread runs until every sender of `requests` is dropped, then
    /// syncs the active segment and returns the result of that sync.
    pub(crate) fn spawn(
        segment: ActiveSegment,
        shared: Arc<Shared>,
        requests: Receiver<WriteRequest>,
    ) -> std::io::Result<JoinHandle<Result<()>>> {
        let writer = Self { segment, shared };
        thread::Builder::new()
            .name("logkv-writer".to_string())
            .spawn(move || writer.run(requests))
    }

    fn run(mut self, requests: Receiver<WriteRequest>) -> Result<()> {
        self.set_state(WriterState::Running);

        for request in requests.iter() {
            match request {
                WriteRequest::Put { key, value, reply } => {
                    let result = self.put(key, value);
                    let _ = reply.send(result);
                }
                WriteRequest::Pause { paused, resume } => {
                    self.set_state(WriterState::Stopped);
                    let _ = paused.send(());
                    let _ = resume.recv();
                    self.set_state(WriterState::Running);
                }
            }
        }

        self.set_state(WriterState::Stopped);
        self.segment.sync()
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let entry = Entry::new(key, value);
        let offset = self.segment.append(&entry)?;

        self.shared.index.insert(entry.key, Location::active(offset));
        self.publish_size();

        if self.segment.is_full(self.shared.config.max_segment_size) {
            self.set_state(WriterState::Rotating);
            let rotated = self.segment.rotate(&self.shared.index);
            self.publish_size();
            self.set_state(WriterState::Running);

            // The append itself already succeeded and is indexed
            if let Err(e) = rotated {
                tracing::warn!("Segment rotation failed: {}", e);
                return Err(e);
            }
        }

        Ok(())
    }

    fn publish_size(&self) {
        self.shared
            .active_size
            .store(self.segment.offset(), Ordering::SeqCst);
    }

    fn set_state(&self, state: WriterState) {
        *self.shared.writer_state.lock() = state;
    }
}
