//! LogKV Server Binary
//!
//! Opens a store and serves it over TCP.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use logkv::config::SyncStrategy;
use logkv::network::Server;
use logkv::{Config, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// LogKV Server
#[derive(Parser, Debug)]
#[command(name = "logkv-server")]
#[command(about = "Log-structured key-value database server")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./db_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8070")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Active segment size in bytes before rotation
    /// (DS_MAX_SEGMENT_BYTES overrides the default)
    #[arg(short = 's', long)]
    max_segment_bytes: Option<u64>,

    /// Number of read workers
    #[arg(short, long, default_value = "10")]
    read_workers: usize,

    /// Run compaction every N seconds (0 disables)
    #[arg(short, long, default_value = "0")]
    compact_every: u64,

    /// fsync after every N writes instead of every write
    #[arg(long)]
    sync_every: Option<usize>,

    /// Cut a partial trailing record off the active segment instead of
    /// refusing to start
    #[arg(long)]
    truncate_partial_tail: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,logkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("LogKV Server v{}", logkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .read_workers(args.read_workers)
        .strict_recovery(!args.truncate_partial_tail);
    if args.compact_every > 0 {
        builder = builder.compaction_interval(Duration::from_secs(args.compact_every));
    }
    if let Some(count) = args.sync_every {
        builder = builder.sync_strategy(SyncStrategy::EveryNEntries { count });
    }

    let mut config = builder.build().apply_env();
    if let Some(size) = args.max_segment_bytes {
        config.max_segment_size = size;
    }

    let store = match Store::open_with_config(config.clone()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Store initialized: {} keys, max segment {} bytes",
        store.key_count(),
        store.config().max_segment_size
    );

    let server = match Server::bind(config, Arc::clone(&store)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C / SIGTERM handler
    let shutdown = server.shutdown_handle();
    let installed = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown.store(true, Ordering::SeqCst);
    });
    if let Err(e) = installed {
        tracing::warn!("Failed to install signal handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
    }

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Server stopped");
}
