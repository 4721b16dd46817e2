// FIFO matchmaking queue.
//
// Named connections are enrolled here after the handshake. As soon as two are
// waiting, the two oldest are removed and paired into a new `Session`, the
// first as player one. Enrollment, pairing, and withdrawal all happen under
// one mutex, so concurrent arrivals can neither be paired twice nor left
// stranded.
//
// Pairing locks the new session before assigning it to either connection and
// only sends the opening lines (`WELCOME`, `OPPONENT_FOUND`, `GAME_START`,
// `SET_TURN`) while still holding that lock. A client that answers the
// opening lines at once always finds its connection assigned, and its input
// waits on the session lock until the opening sequence is out.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use halma_board::Player;
use halma_protocol::ServerMessage;
use tracing::info;

use crate::connection::{Connection, ConnectionId};
use crate::session::{Seat, Session, SessionId, SharedSession, lock_session};

/// Sent to a connection that has to wait for an opponent.
pub const WAITING_FOR_OPPONENT: &str = "Aguardando oponente...";

/// Outcome of `Matchmaker::enroll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrollment {
    /// Queued; no opponent yet.
    Waiting,
    /// Paired immediately with the oldest waiting connection.
    Paired(SessionId),
}

/// The process-wide waiting queue.
pub struct Matchmaker {
    waiting: Mutex<VecDeque<Arc<Connection>>>,
    next_session_id: AtomicU64,
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new()
    }
}

impl Matchmaker {
    pub fn new() -> Self {
        Self {
            waiting: Mutex::new(VecDeque::new()),
            next_session_id: AtomicU64::new(1),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Arc<Connection>>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a connection to the queue, pairing the two oldest if possible.
    pub fn enroll(&self, conn: Arc<Connection>) -> Enrollment {
        let mut waiting = self.queue();
        waiting.push_back(conn);

        if waiting.len() >= 2 {
            if let (Some(first), Some(second)) = (waiting.pop_front(), waiting.pop_front()) {
                return Enrollment::Paired(self.pair(&first, &second));
            }
        }

        if let Some(conn) = waiting.back() {
            info!(conn = %conn.id(), name = %conn.name(), "waiting for an opponent");
            conn.send(&ServerMessage::Info {
                text: WAITING_FOR_OPPONENT.into(),
            });
        }
        Enrollment::Waiting
    }

    /// Remove a still-waiting connection. Returns false if it is not in the
    /// queue (already paired, or never enrolled).
    pub fn withdraw(&self, id: ConnectionId) -> bool {
        let mut waiting = self.queue();
        match waiting.iter().position(|conn| conn.id() == id) {
            Some(pos) => {
                waiting.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn waiting_count(&self) -> usize {
        self.queue().len()
    }

    /// Build and start a session for two connections. Called with the queue
    /// lock held.
    fn pair(&self, first: &Arc<Connection>, second: &Arc<Connection>) -> SessionId {
        let id = SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed));
        info!(
            session = %id,
            player1 = %first.name(),
            player2 = %second.name(),
            "pairing players"
        );

        let shared: SharedSession = Arc::new(Mutex::new(Session::new(
            id,
            Seat::new(first.name().to_owned(), first.outbox().clone()),
            Seat::new(second.name().to_owned(), second.outbox().clone()),
        )));
        let mut session = lock_session(&shared);
        first.assign(Arc::clone(&shared), Player::One);
        second.assign(Arc::clone(&shared), Player::Two);
        session.start();
        id
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::Receiver;
    use std::thread;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::connection::Outbox;

    fn connection(n: u64, name: &str) -> (Arc<Connection>, Receiver<String>) {
        let (outbox, rx) = Outbox::channel(ConnectionId(n));
        (
            Arc::new(Connection::new(ConnectionId(n), name.into(), outbox)),
            rx,
        )
    }

    fn drain(rx: &Receiver<String>) -> Vec<String> {
        rx.try_iter().collect()
    }

    #[test]
    fn first_connection_waits() {
        let matchmaker = Matchmaker::new();
        let (alice, rx) = connection(1, "Alice");
        assert_eq!(matchmaker.enroll(Arc::clone(&alice)), Enrollment::Waiting);
        assert_eq!(matchmaker.waiting_count(), 1);
        assert!(alice.assignment().is_none());
        assert_eq!(drain(&rx), vec!["INFO:Aguardando oponente..."]);
    }

    #[test]
    fn second_connection_pairs_in_arrival_order() {
        let matchmaker = Matchmaker::new();
        let (alice, rx_a) = connection(1, "Alice");
        let (bob, rx_b) = connection(2, "Bob");
        matchmaker.enroll(Arc::clone(&alice));
        let _ = drain(&rx_a);

        assert_eq!(matchmaker.enroll(Arc::clone(&bob)), Enrollment::Paired(SessionId(1)));
        assert_eq!(matchmaker.waiting_count(), 0);
        assert_eq!(alice.assignment().map(|a| a.seat), Some(Player::One));
        assert_eq!(bob.assignment().map(|a| a.seat), Some(Player::Two));
        assert!(Arc::ptr_eq(
            &alice.assignment().unwrap().session,
            &bob.assignment().unwrap().session
        ));

        assert_eq!(
            drain(&rx_a),
            vec![
                "WELCOME:1",
                "OPPONENT_FOUND:Bob",
                "GAME_START",
                "SET_TURN:YOUR_TURN"
            ]
        );
        assert_eq!(
            drain(&rx_b),
            vec![
                "WELCOME:2",
                "OPPONENT_FOUND:Alice",
                "GAME_START",
                "SET_TURN:OPPONENT_TURN"
            ]
        );
    }

    #[test]
    fn move_answering_the_opening_lines_is_handled() {
        let matchmaker = Matchmaker::new();
        let (alice, rx_a) = connection(1, "Alice");
        let (bob, rx_b) = connection(2, "Bob");
        matchmaker.enroll(Arc::clone(&alice));

        // Alice moves the instant her turn is announced, from her own thread.
        let mover = thread::spawn(move || {
            let mut seen = Vec::new();
            for line in rx_a.iter() {
                let turn = line == "SET_TURN:YOUR_TURN";
                seen.push(line);
                if turn {
                    alice.dispatch("MOVE:4:0:5:1");
                    break;
                }
            }
            seen.extend((0..3).map_while(|_| rx_a.recv_timeout(Duration::from_secs(5)).ok()));
            seen
        });

        matchmaker.enroll(Arc::clone(&bob));
        assert_eq!(
            mover.join().unwrap(),
            vec![
                "INFO:Aguardando oponente...",
                "WELCOME:1",
                "OPPONENT_FOUND:Bob",
                "GAME_START",
                "SET_TURN:YOUR_TURN",
                "UPDATE_SCORE:1:0",
                "VALID_MOVE:4:0:5:1",
                "SET_TURN:OPPONENT_TURN"
            ]
        );
        assert_eq!(
            drain(&rx_b),
            vec![
                "WELCOME:2",
                "OPPONENT_FOUND:Alice",
                "GAME_START",
                "SET_TURN:OPPONENT_TURN",
                "UPDATE_SCORE:1:0",
                "OPPONENT_MOVED:4:0:5:1",
                "SET_TURN:YOUR_TURN"
            ]
        );
    }

    #[test]
    fn withdrawn_connection_is_never_paired() {
        let matchmaker = Matchmaker::new();
        let (alice, _rx_a) = connection(1, "Alice");
        let (bob, _rx_b) = connection(2, "Bob");
        let (carol, _rx_c) = connection(3, "Carol");

        matchmaker.enroll(Arc::clone(&alice));
        assert!(matchmaker.withdraw(alice.id()));
        assert!(!matchmaker.withdraw(alice.id()));

        assert_eq!(matchmaker.enroll(Arc::clone(&bob)), Enrollment::Waiting);
        assert!(matches!(
            matchmaker.enroll(Arc::clone(&carol)),
            Enrollment::Paired(_)
        ));
        assert!(alice.assignment().is_none());
        assert_eq!(bob.assignment().map(|a| a.seat), Some(Player::One));
    }

    #[test]
    fn concurrent_enrollments_pair_everyone_once() {
        let matchmaker = Arc::new(Matchmaker::new());
        let connections: Vec<_> = (0..16)
            .map(|n| connection(n, &format!("p{n}")))
            .collect();

        let handles: Vec<_> = connections
            .iter()
            .map(|(conn, _)| {
                let matchmaker = Arc::clone(&matchmaker);
                let conn = Arc::clone(conn);
                thread::spawn(move || matchmaker.enroll(conn))
            })
            .collect();
        let paired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|e| matches!(e, Enrollment::Paired(_)))
            .count();

        assert_eq!(paired, 8);
        assert_eq!(matchmaker.waiting_count(), 0);
        for (conn, _) in &connections {
            assert!(conn.assignment().is_some(), "{} left unpaired", conn.name());
        }
    }
}
