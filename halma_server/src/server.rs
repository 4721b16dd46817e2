// TCP listener and per-connection startup.
//
// Architecture: thread-per-connection with a shared matchmaker.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts sockets and
//   spawns one handler thread for each. The listener is non-blocking so the
//   loop can notice `keep_running` going false.
// - **Handler thread**: runs the handshake (first line must be `SET_NAME`,
//   within the configured timeout), spawns the connection's writer thread,
//   enrolls it with the `Matchmaker`, then becomes the connection's reader
//   (`connection::reader_loop`) until the socket closes. Once the reader
//   stops, the handler shuts the socket down in both directions so the
//   client sees EOF even though the session still holds its outbox.
//
// There is no central event loop. Each session is guarded by its own mutex
// and the matchmaker by another, so matches proceed independently.
//
// Shutdown: `ServerHandle::stop` clears `keep_running` and joins the listener
// thread. Connections already accepted keep running until their clients
// leave.

use std::io::{self, BufReader};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use halma_protocol::{ClientMessage, read_line};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::{
    Connection, ConnectionId, Outbox, reader_loop, sanitize_name, writer_loop,
};
use crate::error::ServerError;
use crate::matchmaking::Matchmaker;

/// How long the listener sleeps when no connection is pending.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Handle returned by `start_server` to control the running listener.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for the listener to exit.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join();
    }

    /// Block until the listener exits (normally never, for the binary).
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Bind the configured address and start accepting on a background thread.
/// Returns a handle for stopping it and the actual bound address (useful
/// when port 0 is used to let the OS pick a free port).
pub fn start_server(config: ServerConfig) -> Result<(ServerHandle, SocketAddr), ServerError> {
    let bind_addr = config.bind_address();
    let listener = TcpListener::bind(&bind_addr).map_err(|source| ServerError::Bind {
        addr: bind_addr.clone(),
        source,
    })?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    info!(%addr, "listening");

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_listener = Arc::clone(&keep_running);
    let thread = thread::Builder::new()
        .name("halma-listener".into())
        .spawn(move || accept_loop(listener, config, keep_running_listener))?;

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Accept connections until `keep_running` is cleared or the listener fails.
fn accept_loop(listener: TcpListener, config: ServerConfig, keep_running: Arc<AtomicBool>) {
    let matchmaker = Arc::new(Matchmaker::new());
    let config = Arc::new(config);
    let mut next_id = 1u64;

    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let id = ConnectionId(next_id);
                next_id += 1;
                info!(conn = %id, %peer, "connection accepted");

                let matchmaker = Arc::clone(&matchmaker);
                let config = Arc::clone(&config);
                let spawned = thread::Builder::new()
                    .name(format!("halma-conn-{}", id.0))
                    .spawn(move || handle_connection(stream, id, &matchmaker, &config));
                if let Err(err) = spawned {
                    warn!(conn = %id, %err, "failed to spawn connection thread");
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(err) => {
                warn!(%err, "accept failed, listener stopping");
                break;
            }
        }
    }
    info!("listener stopped");
}

/// Run one connection from handshake to disconnect.
fn handle_connection(
    stream: TcpStream,
    id: ConnectionId,
    matchmaker: &Arc<Matchmaker>,
    config: &ServerConfig,
) {
    if let Err(err) = serve(stream, id, matchmaker, config) {
        info!(conn = %id, %err, "connection setup failed");
    }
}

fn serve(
    stream: TcpStream,
    id: ConnectionId,
    matchmaker: &Arc<Matchmaker>,
    config: &ServerConfig,
) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(config.handshake_timeout())?;
    let mut reader = BufReader::new(stream.try_clone()?);

    let Some(name) = read_handshake(&mut reader, id, config.max_line_length) else {
        let _ = stream.shutdown(Shutdown::Both);
        return Ok(());
    };
    stream.set_read_timeout(None)?;

    let (outbox, rx) = Outbox::channel(id);
    let write_stream = stream.try_clone()?;
    thread::Builder::new()
        .name(format!("halma-write-{}", id.0))
        .spawn(move || writer_loop(write_stream, rx, id))?;

    info!(conn = %id, %name, "player named");
    let conn = Arc::new(Connection::new(id, name, outbox));
    matchmaker.enroll(Arc::clone(&conn));
    reader_loop(conn, reader, Arc::clone(matchmaker), config.max_line_length);
    let _ = stream.shutdown(Shutdown::Both);
    debug!(conn = %id, "socket shut down");
    Ok(())
}

/// Read the first line and return the sanitized player name, or `None` if
/// the client sent anything other than `SET_NAME` (or nothing in time).
fn read_handshake(
    reader: &mut BufReader<TcpStream>,
    id: ConnectionId,
    max_line_length: usize,
) -> Option<String> {
    let line = match read_line(reader, max_line_length) {
        Ok(Some(line)) => line,
        Ok(None) => {
            debug!(conn = %id, "closed before handshake");
            return None;
        }
        Err(err) => {
            warn!(conn = %id, %err, "handshake read failed");
            return None;
        }
    };
    match ClientMessage::decode(&line) {
        Ok(ClientMessage::SetName { name }) => Some(sanitize_name(&name)),
        _ => {
            warn!(conn = %id, %line, "first line was not SET_NAME, closing");
            None
        }
    }
}
