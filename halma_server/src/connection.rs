// Per-client connection handling.
//
// Each accepted socket gets two threads:
// - **Reader** (`reader_loop`): blocks on the next line, decodes it, and
//   forwards the `ClientMessage` to the session this connection is assigned
//   to, tagged with the connection's seat. Malformed lines are answered with
//   an `ERROR` and otherwise ignored. On EOF or a read error it reports the
//   disconnect exactly once: to the matchmaker if still waiting, otherwise to
//   the session. The server then shuts the socket down.
// - **Writer** (`writer_loop`): drains an `mpsc` channel of encoded lines and
//   writes them to the socket. A write failure shuts the socket down so the
//   reader sees it and reports the disconnect.
//
// `Outbox` is the sending half of that channel. `send` only enqueues, so it is
// safe to call from either player's reader thread while holding the session
// lock; nothing blocks on the network inside a locked section.
//
// A `Connection` starts unassigned (held by the matchmaking queue) and is
// assigned to exactly one session when paired. The assignment is a
// `OnceLock`, so it can never change afterwards.

use std::fmt;
use std::io::{BufRead, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, OnceLock};

use halma_board::Player;
use halma_protocol::{ClientMessage, ServerMessage, read_line, write_line};
use tracing::{debug, info, trace, warn};

use crate::matchmaking::Matchmaker;
use crate::session::{SharedSession, lock_session};

/// Reply to any line that fails to decode.
pub const MALFORMED_COMMAND: &str = "Comando malformado.";

/// Name used when a client sends an empty `SET_NAME`.
pub const DEFAULT_PLAYER_NAME: &str = "Jogador Anônimo";

/// Server-assigned connection number, unique for the life of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Thread-safe, non-blocking send handle for one client.
#[derive(Clone, Debug)]
pub struct Outbox {
    id: ConnectionId,
    tx: Sender<String>,
}

impl Outbox {
    /// An outbox plus the receiving end that a writer thread (or a test)
    /// drains.
    pub fn channel(id: ConnectionId) -> (Self, Receiver<String>) {
        let (tx, rx) = mpsc::channel();
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a message for this client. Silently drops it if the writer is
    /// gone (the reader will report the disconnect).
    pub fn send(&self, msg: &ServerMessage) {
        let line = msg.encode();
        trace!(conn = %self.id, %line, "send");
        if self.tx.send(line).is_err() {
            debug!(conn = %self.id, "writer gone, dropping message");
        }
    }
}

/// Where a paired connection's input goes.
pub struct Assignment {
    pub session: SharedSession,
    pub seat: Player,
}

/// One connected, named client.
pub struct Connection {
    id: ConnectionId,
    name: String,
    outbox: Outbox,
    assignment: OnceLock<Assignment>,
}

impl Connection {
    pub fn new(id: ConnectionId, name: String, outbox: Outbox) -> Self {
        Self {
            id,
            name,
            outbox,
            assignment: OnceLock::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn send(&self, msg: &ServerMessage) {
        self.outbox.send(msg);
    }

    /// Hand this connection to a session. Returns false if it already
    /// belongs to one.
    pub fn assign(&self, session: SharedSession, seat: Player) -> bool {
        self.assignment.set(Assignment { session, seat }).is_ok()
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.get()
    }

    /// Decode one inbound line and route it.
    pub fn dispatch(&self, line: &str) {
        let message = match ClientMessage::decode(line) {
            Ok(message) => message,
            Err(err) => {
                debug!(conn = %self.id, %err, "malformed line");
                self.send(&ServerMessage::Error {
                    text: MALFORMED_COMMAND.into(),
                });
                return;
            }
        };

        match self.assignment.get() {
            Some(assignment) => {
                lock_session(&assignment.session).handle_message(assignment.seat, message);
            }
            None => debug!(conn = %self.id, ?message, "not paired yet, ignoring"),
        }
    }

    /// Report that the socket is gone. Called once, when the reader stops.
    pub fn disconnected(&self, matchmaker: &Matchmaker) {
        // Withdraw first: pairing assigns under the queue lock, so once this
        // returns false any assignment is visible.
        if matchmaker.withdraw(self.id) {
            info!(conn = %self.id, name = %self.name, "left the waiting queue");
            return;
        }
        if let Some(assignment) = self.assignment.get() {
            lock_session(&assignment.session).handle_disconnect(assignment.seat);
        }
    }
}

/// Trim a requested player name and strip characters that would break field
/// boundaries when the name is embedded in other messages.
pub fn sanitize_name(raw: &str) -> String {
    let name: String = raw
        .trim()
        .chars()
        .map(|c| if c == ':' || c == '|' || c.is_control() { '_' } else { c })
        .collect();
    if name.is_empty() {
        DEFAULT_PLAYER_NAME.into()
    } else {
        name
    }
}

/// Read lines until EOF or error, dispatching each one, then report the
/// disconnect.
pub fn reader_loop<R: BufRead>(
    conn: Arc<Connection>,
    mut reader: R,
    matchmaker: Arc<Matchmaker>,
    max_line_length: usize,
) {
    loop {
        match read_line(&mut reader, max_line_length) {
            Ok(Some(line)) => conn.dispatch(&line),
            Ok(None) => {
                info!(conn = %conn.id(), name = %conn.name(), "client closed connection");
                break;
            }
            Err(err) => {
                info!(conn = %conn.id(), name = %conn.name(), %err, "read failed");
                break;
            }
        }
    }
    conn.disconnected(&matchmaker);
}

/// Write queued lines until every `Outbox` clone is dropped or a write fails.
pub fn writer_loop(stream: TcpStream, rx: Receiver<String>, id: ConnectionId) {
    let mut writer = BufWriter::new(&stream);
    for line in rx {
        if let Err(err) = write_line(&mut writer, &line) {
            warn!(conn = %id, %err, "write failed, closing socket");
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn drain(rx: &Receiver<String>) -> Vec<String> {
        rx.try_iter().collect()
    }

    #[test]
    fn sanitize_name_trims_and_replaces_separators() {
        assert_eq!(sanitize_name("  Alice "), "Alice");
        assert_eq!(sanitize_name("a:b|c"), "a_b_c");
        assert_eq!(sanitize_name("   "), DEFAULT_PLAYER_NAME);
        assert_eq!(sanitize_name("Zé"), "Zé");
    }

    #[test]
    fn outbox_encodes_messages() {
        let (outbox, rx) = Outbox::channel(ConnectionId(7));
        outbox.send(&ServerMessage::GameStart);
        outbox.send(&ServerMessage::Info {
            text: "olá".into(),
        });
        assert_eq!(drain(&rx), vec!["GAME_START", "INFO:olá"]);
        assert_eq!(outbox.id(), ConnectionId(7));
    }

    #[test]
    fn send_after_writer_gone_is_silent() {
        let (outbox, rx) = Outbox::channel(ConnectionId(1));
        drop(rx);
        outbox.send(&ServerMessage::GameStart);
    }

    #[test]
    fn malformed_line_gets_error_reply_even_unpaired() {
        let (outbox, rx) = Outbox::channel(ConnectionId(1));
        let conn = Connection::new(ConnectionId(1), "Alice".into(), outbox);
        conn.dispatch("MOVE:1:x:3:4");
        conn.dispatch("HELLO");
        conn.dispatch("FORFEIT");
        assert_eq!(
            drain(&rx),
            vec!["ERROR:Comando malformado.", "ERROR:Comando malformado."]
        );
    }

    #[test]
    fn unpaired_reader_withdraws_from_queue_on_eof() {
        let matchmaker = Arc::new(Matchmaker::new());
        let (outbox, rx) = Outbox::channel(ConnectionId(3));
        let conn = Arc::new(Connection::new(ConnectionId(3), "Alice".into(), outbox));
        matchmaker.enroll(Arc::clone(&conn));
        assert_eq!(matchmaker.waiting_count(), 1);

        reader_loop(
            conn,
            Cursor::new(b"CHAT:anyone?\n".to_vec()),
            Arc::clone(&matchmaker),
            64,
        );
        assert_eq!(matchmaker.waiting_count(), 0);
        assert_eq!(drain(&rx), vec!["INFO:Aguardando oponente..."]);
    }
}
