// halma_server: matchmaking and match server for two-player Halma.
//
// Clients connect over TCP, name themselves with `SET_NAME`, and wait in a
// FIFO queue until a second player arrives. Each pair then plays one match
// on a `Session`, which enforces turns, chain jumps, and the win condition
// using the `halma_board` rules engine.
//
// Module overview:
// - `config.rs`:      `ServerConfig` defaults and TOML loading.
// - `connection.rs`:  One connected client: outbox, reader and writer loops,
//                     routing of decoded lines to the client's session.
// - `matchmaking.rs`: The waiting queue and atomic pairing.
// - `session.rs`:     The per-match state machine.
// - `server.rs`:      TCP listener and per-connection handshake.
// - `client.rs`:      `NetClient`, a blocking line client for tests and bots.
// - `error.rs`:       Error types.
//
// Dependencies: `halma_board` (rules) and `halma_protocol` (wire format).
// The server can run as a standalone binary (`main.rs`) or be embedded via
// the library API (`start_server`).

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod matchmaking;
pub mod server;
pub mod session;

pub use client::NetClient;
pub use config::{ConfigError, ServerConfig};
pub use error::{ClientError, ServerError};
pub use server::{ServerHandle, start_server};
