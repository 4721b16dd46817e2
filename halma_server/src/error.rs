// Error types for the server and the line client.
//
// Per-connection problems (malformed lines, broken sockets) never surface as
// errors here: they are answered on the wire or turned into a disconnect.
// These types cover the failures a caller can actually act on.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed")]
    Connect(#[source] io::Error),

    #[error("send failed")]
    Send(#[source] io::Error),
}
