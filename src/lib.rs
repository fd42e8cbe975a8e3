//! # LogKV
//!
//! A log-structured key-value store with:
//! - Append-only segment files and an in-memory hash index
//! - Size-based segment rotation
//! - Compaction of closed segments (on demand or periodic)
//! - Crash recovery by replaying every segment
//! - Single-writer / reader-pool concurrency model
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                 │
//! │         put/get/size/compact/close (thread safe)             │
//! └──────────┬──────────────────────┬──────────────────┬────────┘
//!            │                      │                  │
//!            ▼                      ▼                  ▼
//!   ┌────────────────┐    ┌─────────────────┐   ┌─────────────┐
//!   │ Write          │    │   Read Pool     │   │  Compactor  │
//!   │ Serializer     │    │  (N workers)    │   │ (exclusive  │
//!   │ (1 thread)     │    │                 │   │  w/ writer) │
//!   └───────┬────────┘    └────────┬────────┘   └──────┬──────┘
//!           │        ┌─────────────▼─────────────┐     │
//!           ├───────►│      Index (RwLock)       │◄────┤
//!           │        └───────────────────────────┘     │
//!           ▼                                          ▼
//!   ┌─────────────────────────────────────────────────────────┐
//!   │  current-data   segment-<ts>.seg   segment-<ts>-merged  │
//!   └─────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod index;
pub mod segment;
pub mod store;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogKvError, Result};
pub use config::Config;
pub use store::{CompactionStats, RecoveryReport, Store, WriterState};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LogKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
