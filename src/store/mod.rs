//! Store Module
//!
//! The public storage engine: segment store, write serializer, read pool,
//! compactor and recovery wired together.
//!
//! ## Concurrency Model
//! ```text
//!   put ──► [bounded MPSC] ──► writer thread ──► active segment
//!                                   │
//!                                   ▼
//!                       Index (RwLock, lookup/update only)
//!                                   ▲
//!   get ──► [bounded MPMC] ──► reader threads ──► segment files (read-only)
//! ```
//! - Puts are applied in submission order by one thread
//! - Gets run in parallel with each other and with puts
//! - Compaction pauses the writer for its whole duration; gets continue

mod compaction;
mod readers;
mod recovery;
mod writer;

pub use compaction::CompactionStats;
pub use recovery::RecoveryReport;
pub use writer::WriterState;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Sender};
use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{LogKvError, Result};
use crate::index::Index;
use crate::protocol::Command;
use crate::segment::{self, ActiveSegment};

use compaction::BackgroundCompactor;
use readers::ReadRequest;
use writer::{WriteRequest, WriteSerializer};

/// State shared between the store handle and its worker threads
pub(crate) struct Shared {
    pub(crate) dir: PathBuf,
    pub(crate) config: Config,
    pub(crate) index: Index,

    /// Size of the active segment, published by the writer
    pub(crate) active_size: AtomicU64,
    pub(crate) writer_state: Mutex<WriterState>,

    /// Serializes compactions (on demand and background)
    pub(crate) compaction_gate: Mutex<()>,

    /// None once the store is closed
    write_tx: RwLock<Option<Sender<WriteRequest>>>,
    read_tx: RwLock<Option<Sender<ReadRequest>>>,
}

impl Shared {
    pub(crate) fn send_write(&self, request: WriteRequest) -> Result<()> {
        match self.write_tx.read().as_ref() {
            Some(tx) => tx.send(request).map_err(|_| LogKvError::Closed),
            None => Err(LogKvError::Closed),
        }
    }

    fn send_read(&self, request: ReadRequest) -> Result<()> {
        match self.read_tx.read().as_ref() {
            Some(tx) => tx.send(request).map_err(|_| LogKvError::Closed),
            None => Err(LogKvError::Closed),
        }
    }
}

/// A log-structured key-value store rooted at one directory
///
/// All methods take `&self` and are safe to call from many threads; share
/// the store with `Arc<Store>`.
pub struct Store {
    shared: Arc<Shared>,
    writer: Mutex<Option<JoinHandle<Result<()>>>>,
    readers: Mutex<Vec<JoinHandle<()>>>,
    compactor: Mutex<Option<BackgroundCompactor>>,
    recovery: RecoveryReport,
}

impl Store {
    /// Open or create a store in `dir` with default settings
    ///
    /// `DS_MAX_SEGMENT_BYTES` in the environment overrides the segment size.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().data_dir(dir.as_ref()).build().apply_env();
        Self::open_with_config(config)
    }

    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Create the data directory and drop stale compaction scratch files
    /// 2. Replay every segment into the index
    /// 3. Open (or create) the active segment at its current length
    /// 4. Start the writer, the read pool and the optional compactor
    pub fn open_with_config(config: Config) -> Result<Self> {
        validate(&config)?;

        let dir = config.data_dir.clone();
        fs::create_dir_all(&dir)?;

        let stale = segment::remove_compaction_leftovers(&dir)?;
        if stale > 0 {
            tracing::info!("Removed {} stale compaction files", stale);
        }

        let index = Index::new();
        let recovery = recovery::recover(&dir, &index, config.strict_recovery)?;
        let active = ActiveSegment::open(&dir, config.sync_strategy)?;

        tracing::info!(
            "Recovered {} keys from {} segments ({} records, {} bytes truncated)",
            recovery.keys,
            recovery.segments_replayed,
            recovery.entries_replayed,
            recovery.truncated_bytes
        );

        let (write_tx, write_rx) = bounded(config.queue_capacity);
        let (read_tx, read_rx) = bounded(config.queue_capacity);

        let shared = Arc::new(Shared {
            dir,
            index,
            active_size: AtomicU64::new(active.offset()),
            writer_state: Mutex::new(WriterState::Running),
            compaction_gate: Mutex::new(()),
            write_tx: RwLock::new(Some(write_tx)),
            read_tx: RwLock::new(Some(read_tx)),
            config,
        });

        // From here on, dropping `store` on error shuts down whatever started
        let store = Self {
            shared: Arc::clone(&shared),
            writer: Mutex::new(None),
            readers: Mutex::new(Vec::new()),
            compactor: Mutex::new(None),
            recovery,
        };

        let writer = WriteSerializer::spawn(active, Arc::clone(&shared), write_rx)?;
        *store.writer.lock() = Some(writer);

        let readers = readers::spawn_pool(&shared, &read_rx, shared.config.read_workers)?;
        *store.readers.lock() = readers;

        if let Some(interval) = shared.config.compaction_interval {
            let compactor = BackgroundCompactor::spawn(Arc::clone(&shared), interval)?;
            *store.compactor.lock() = Some(compactor);
        }

        tracing::info!("Store opened at {}", shared.dir.display());
        Ok(store)
    }

    /// Execute a protocol command
    ///
    /// Routes commands to the matching operation
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Compact => {
                self.compact()?;
                Ok(None)
            }
            Command::Size => Ok(Some(self.size().to_be_bytes().to_vec())),
            Command::Ping => Ok(Some(b"PONG".to_vec())),
        }
    }

    /// Store a value
    ///
    /// Returns once the record is appended (and synced, per the sync
    /// strategy) and the index points at it. A failed put leaves the index
    /// untouched for that key.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.shared.send_write(WriteRequest::Put {
            key: key.to_vec(),
            value: value.to_vec(),
            reply: reply_tx,
        })?;
        reply_rx.recv().map_err(|_| LogKvError::Closed)?
    }

    /// Fetch the latest value of a key
    ///
    /// Fails with `KeyNotFound` for keys that were never written.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let (reply_tx, reply_rx) = bounded(1);
        self.shared.send_read(ReadRequest {
            key: key.to_vec(),
            reply: reply_tx,
        })?;
        reply_rx.recv().map_err(|_| LogKvError::Closed)?
    }

    /// Size of the active segment in bytes
    pub fn size(&self) -> u64 {
        self.shared.active_size.load(Ordering::SeqCst)
    }

    /// Merge all closed segments into one
    ///
    /// Blocks puts for the duration; gets keep working. All-or-nothing: on
    /// error the previous segments and index are left intact.
    pub fn compact(&self) -> Result<CompactionStats> {
        compaction::compact(&self.shared)
    }

    /// Close the store gracefully
    ///
    /// Stops accepting requests, lets queued ones finish, then syncs and
    /// closes the active segment. Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        if let Some(compactor) = self.compactor.lock().take() {
            compactor.stop();
        }

        let was_open = self.shared.write_tx.write().take().is_some();
        let result = match self.writer.lock().take() {
            Some(handle) => handle
                .join()
                .map_err(|_| LogKvError::WorkerPanicked("logkv-writer".to_string()))
                .and_then(|synced| synced),
            None => Ok(()),
        };

        self.shared.read_tx.write().take();
        for handle in self.readers.lock().drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Read worker panicked");
            }
        }

        if was_open {
            tracing::info!("Store closed at {}", self.shared.dir.display());
        }
        result
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn dir(&self) -> &Path {
        &self.shared.dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.shared.index.len()
    }

    /// Paths of the closed segments currently on disk
    pub fn closed_segments(&self) -> Result<Vec<PathBuf>> {
        Ok(segment::list_closed(&self.shared.dir)?
            .into_iter()
            .map(|s| s.path)
            .collect())
    }

    /// Current state of the write serializer
    pub fn writer_state(&self) -> WriterState {
        *self.shared.writer_state.lock()
    }

    /// What recovery found when the store was opened
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Error closing store: {}", e);
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.max_segment_size == 0 {
        return Err(LogKvError::Config("max_segment_size must be positive".to_string()));
    }
    if config.read_workers == 0 {
        return Err(LogKvError::Config("read_workers must be positive".to_string()));
    }
    if config.queue_capacity == 0 {
        return Err(LogKvError::Config("queue_capacity must be positive".to_string()));
    }
    Ok(())
}
