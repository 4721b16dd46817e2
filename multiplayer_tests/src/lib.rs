// Test-only player for end-to-end match tests.
//
// Wraps the real `NetClient` (from `halma_server::client`) and a local
// `Board` mirror (from `halma_board`) to provide a synchronous,
// test-friendly API for exercising the full pipeline:
// connect → pair → move → server validation → both mirrors updated.
//
// Every accepted move the server reports (`VALID_MOVE`, `JUMP_MOVE`,
// `OPPONENT_MOVED`) is replayed onto the mirror with `Board::relocate`, so
// after any exchange the two players' mirrors must agree with each other and
// with what the rules allow.
//
// The only test-specific code here is the blocking wrappers around
// `NetClient::recv_timeout`. All networking uses the same code paths as a
// real client.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::net::SocketAddr;
use std::time::Duration;

use halma_board::{Board, Cell, Player};
use halma_protocol::{ServerMessage, TurnStatus};
use halma_server::NetClient;

/// Default timeout for blocking receive operations.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `expect_silence` listens before concluding nothing is coming.
const SILENCE_WINDOW: Duration = Duration::from_millis(200);

/// A test player wrapping a real NetClient and a mirrored board.
pub struct TestPlayer {
    client: NetClient,
    board: Board,
    pub seat: Option<Player>,
    pub opponent: Option<String>,
    pub my_turn: bool,
}

impl TestPlayer {
    /// Connect to a server and send `SET_NAME`.
    pub fn connect(addr: SocketAddr, name: &str) -> Self {
        let client = NetClient::connect(addr, name).expect("TestPlayer::connect failed");
        Self {
            client,
            board: Board::new(),
            seat: None,
            opponent: None,
            my_turn: false,
        }
    }

    /// The locally mirrored board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Blocking receive of the next server message, tracking seat, turn,
    /// and board state as a side effect.
    pub fn next(&mut self) -> ServerMessage {
        let msg = self
            .client
            .recv_timeout(RECV_TIMEOUT)
            .expect("timed out waiting for a server message");
        self.observe(&msg);
        msg
    }

    /// Receive `n` messages and return them as wire lines.
    pub fn next_lines(&mut self, n: usize) -> Vec<String> {
        (0..n).map(|_| self.next().encode()).collect()
    }

    /// Blocking receive, skipping messages until `pred` matches.
    pub fn next_matching(&mut self, mut pred: impl FnMut(&ServerMessage) -> bool) -> ServerMessage {
        loop {
            let msg = self.next();
            if pred(&msg) {
                return msg;
            }
        }
    }

    /// Consume the queue notice (if any) and the four opening lines.
    pub fn wait_for_game_start(&mut self) {
        self.next_matching(|m| matches!(m, ServerMessage::SetTurn(_)));
        assert!(self.seat.is_some(), "game started without WELCOME");
    }

    /// Assert that nothing arrives for a short while.
    pub fn expect_silence(&mut self) {
        if let Some(msg) = self.client.recv_timeout(SILENCE_WINDOW) {
            panic!("expected no message, got {msg:?}");
        }
    }

    pub fn send_move(&mut self, from: (i32, i32), to: (i32, i32)) {
        self.client
            .send_move(Cell::new(from.0, from.1), Cell::new(to.0, to.1))
            .expect("send_move failed");
    }

    pub fn request_valid_moves(&mut self, cell: (i32, i32)) {
        self.client
            .request_valid_moves(Cell::new(cell.0, cell.1))
            .expect("request_valid_moves failed");
    }

    pub fn end_chain_jump(&mut self) {
        self.client.end_chain_jump().expect("end_chain_jump failed");
    }

    pub fn forfeit(&mut self) {
        self.client.forfeit().expect("forfeit failed");
    }

    pub fn chat(&mut self, text: &str) {
        self.client.send_chat(text).expect("send_chat failed");
    }

    /// Send a line verbatim (for malformed-input tests).
    pub fn send_raw(&mut self, line: &str) {
        self.client.send_raw(line).expect("send_raw failed");
    }

    /// Close the socket without a goodbye.
    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }

    fn observe(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::Welcome { player } => self.seat = Some(*player),
            ServerMessage::OpponentFound { name } => self.opponent = Some(name.clone()),
            ServerMessage::SetTurn(status) => self.my_turn = *status == TurnStatus::YourTurn,
            ServerMessage::ValidMove(coords)
            | ServerMessage::JumpMove(coords)
            | ServerMessage::OpponentMoved(coords) => self.board.relocate(coords.from, coords.to),
            _ => {}
        }
    }
}
