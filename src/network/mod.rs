//! Network Module
//!
//! TCP server exposing the store, and a matching blocking client.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection, capped by `max_connections`
//! - Commands routed through `Store::execute`

mod server;
mod connection;
mod client;

pub use server::Server;
pub use connection::Connection;
pub use client::Client;
