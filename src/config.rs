//! Configuration for LogKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides the maximum segment size (bytes)
pub const ENV_MAX_SEGMENT_BYTES: &str = "DS_MAX_SEGMENT_BYTES";

/// Default maximum size of the active segment before rotation (10 MB)
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of read workers
pub const DEFAULT_READ_WORKERS: usize = 10;

/// Default capacity of the write and read request queues
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Main configuration for a LogKV store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding all segment files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── current-data              (active segment)
    ///     ├── segment-<nanos>.seg       (closed segments)
    ///     └── segment-<nanos>-merged.seg (compaction output)
    pub data_dir: PathBuf,

    /// Active segment size (bytes) at which the writer rotates
    pub max_segment_size: u64,

    /// Sync strategy: how often to fsync the active segment
    pub sync_strategy: SyncStrategy,

    /// Fail Open on a partial trailing record in the active segment.
    /// When false the partial record is truncated away and Open proceeds.
    pub strict_recovery: bool,

    // -------------------------------------------------------------------------
    // Concurrency Configuration
    // -------------------------------------------------------------------------
    /// Number of read worker threads
    pub read_workers: usize,

    /// Capacity of the bounded write and read queues
    pub queue_capacity: usize,

    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// Run compaction in the background on this period (None = on demand only)
    pub compaction_interval: Option<Duration>,

    /// Background compaction only runs with at least this many closed segments
    pub compaction_min_segments: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Segment sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// fsync after N appends (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./db_data"),
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            sync_strategy: SyncStrategy::EveryWrite,
            strict_recovery: true,
            read_workers: DEFAULT_READ_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            compaction_interval: None,
            compaction_min_segments: 2,
            listen_addr: "127.0.0.1:8070".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Apply overrides from the process environment
    ///
    /// Only positive integers are accepted for `DS_MAX_SEGMENT_BYTES`;
    /// anything else is ignored.
    pub fn apply_env(mut self) -> Self {
        let raw = std::env::var(ENV_MAX_SEGMENT_BYTES).ok();
        match parse_segment_size(raw.as_deref()) {
            Some(size) => {
                tracing::debug!("{} overrides max segment size: {}", ENV_MAX_SEGMENT_BYTES, size);
                self.max_segment_size = size;
            }
            None => {
                if let Some(raw) = raw {
                    tracing::warn!("Ignoring invalid {}={:?}", ENV_MAX_SEGMENT_BYTES, raw);
                }
            }
        }
        self
    }
}

/// Parse a segment size override; `None` for missing, non-numeric or zero
pub fn parse_segment_size(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|&size| size > 0)
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all segments)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the rotation threshold (in bytes)
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.config.max_segment_size = size;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Refuse to open a store whose active segment ends in a partial record
    pub fn strict_recovery(mut self, strict: bool) -> Self {
        self.config.strict_recovery = strict;
        self
    }

    /// Set the number of read workers
    pub fn read_workers(mut self, count: usize) -> Self {
        self.config.read_workers = count;
        self
    }

    /// Set the request queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Enable periodic background compaction
    pub fn compaction_interval(mut self, interval: Duration) -> Self {
        self.config.compaction_interval = Some(interval);
        self
    }

    /// Set the closed segment count that triggers background compaction
    pub fn compaction_min_segments(mut self, count: usize) -> Self {
        self.config.compaction_min_segments = count;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
