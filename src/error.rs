//! Error types for LogKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LogKvError
pub type Result<T> = std::result::Result<T, LogKvError>;

/// Unified error type for LogKV operations
#[derive(Debug, Error)]
pub enum LogKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Segment Errors
    // -------------------------------------------------------------------------
    #[error("Segment corruption detected: {0}")]
    Corruption(String),

    /// A record started but the data ended before it was complete.
    /// `consumed` is the number of bytes read before running out.
    #[error("Truncated record: {consumed} bytes of an incomplete record")]
    TruncatedRecord { consumed: u64 },

    #[error("Record too large: {0} bytes")]
    RecordTooLarge(u64),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Store is closed")]
    Closed,

    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogKvError {
    /// True for the ordinary "no such key" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, LogKvError::KeyNotFound)
    }

    /// True when on-disk data could not be decoded
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            LogKvError::Corruption(_) | LogKvError::TruncatedRecord { .. }
        )
    }
}
