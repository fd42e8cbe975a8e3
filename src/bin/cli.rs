//! LogKV CLI Client
//!
//! Command-line interface for interacting with a LogKV server.

use clap::{Parser, Subcommand};
use logkv::network::Client;
use logkv::LogKvError;

/// LogKV CLI
#[derive(Parser, Debug)]
#[command(name = "logkv-cli")]
#[command(about = "CLI for the LogKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Merge closed segments on the server
    Compact,

    /// Print the size of the active segment
    Size,

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let result = match args.command {
        Commands::Get { key } => client
            .get(key.as_bytes())
            .map(|value| println!("{}", String::from_utf8_lossy(&value))),
        Commands::Put { key, value } => client
            .put(key.as_bytes(), value.as_bytes())
            .map(|_| println!("OK")),
        Commands::Compact => client.compact().map(|_| println!("OK")),
        Commands::Size => client.size().map(|size| println!("{}", size)),
        Commands::Ping => client.ping().map(|_| println!("PONG")),
    };

    match result {
        Ok(()) => {}
        Err(LogKvError::KeyNotFound) => {
            eprintln!("(not found)");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}
