// Blocking line client for the game server.
//
// Gives headless callers (integration tests, bots, a future front end) a
// simple interface to a server. Architecture:
// - `connect()` performs the TCP connect and sends `SET_NAME` on the calling
//   thread, then spawns a background reader thread.
// - The reader thread calls `read_line()` in a loop, decodes each line as a
//   `ServerMessage`, and pushes it into an `mpsc` channel. Lines that fail to
//   decode are logged and skipped.
// - The caller holds a `BufWriter<TcpStream>` for sending; each message is
//   written and flushed synchronously (they are a few bytes each).
// - `poll()` drains the inbox without blocking; `recv_timeout()` waits for
//   the next message.
//
// The client does not wait for `WELCOME`: pairing may take arbitrarily long,
// so the opening lines arrive through the inbox like everything else.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use halma_board::Cell;
use halma_protocol::{
    ClientMessage, MAX_LINE_LENGTH, MoveCoords, ServerMessage, read_line, write_line,
};
use tracing::debug;

use crate::error::ClientError;

/// TCP client for one player.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
}

impl NetClient {
    /// Connect, send `SET_NAME`, and start the reader thread.
    pub fn connect(addr: impl ToSocketAddrs, player_name: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        let reader_stream = stream.try_clone().map_err(ClientError::Connect)?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(BufReader::new(reader_stream), tx);
        });

        let mut client = Self {
            writer: BufWriter::new(stream),
            inbox: rx,
            _reader_thread: Some(reader_thread),
        };
        client.send(&ClientMessage::SetName {
            name: player_name.into(),
        })?;
        Ok(client)
    }

    /// Send any client message.
    pub fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        self.send_raw(&msg.encode())
    }

    /// Send a line verbatim, bypassing the encoder.
    pub fn send_raw(&mut self, line: &str) -> Result<(), ClientError> {
        write_line(&mut self.writer, line).map_err(ClientError::Send)
    }

    pub fn send_move(&mut self, from: Cell, to: Cell) -> Result<(), ClientError> {
        self.send(&ClientMessage::Move(MoveCoords::new(from, to)))
    }

    pub fn request_valid_moves(&mut self, cell: Cell) -> Result<(), ClientError> {
        self.send(&ClientMessage::GetValidMoves { cell })
    }

    pub fn end_chain_jump(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::EndChainJump)
    }

    pub fn forfeit(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::Forfeit)
    }

    pub fn send_chat(&mut self, text: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::Chat { text: text.into() })
    }

    /// Close the socket. The server treats this as a disconnect.
    pub fn disconnect(&mut self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        self.inbox.try_iter().collect()
    }

    /// Wait up to `timeout` for the next server message. `None` on timeout or
    /// once the connection is closed and the inbox is empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
        match self.inbox.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Reader thread: read lines in a loop, push decoded messages to the channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: Sender<ServerMessage>) {
    while let Ok(Some(line)) = read_line(&mut reader, MAX_LINE_LENGTH) {
        match ServerMessage::decode(&line) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Caller dropped the client
                }
            }
            Err(err) => debug!(%line, %err, "skipping undecodable server line"),
        }
    }
}
