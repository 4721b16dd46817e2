// Per-match state machine.
//
// A `Session` owns the board and both seats of one match. The two players'
// reader threads call into it through a shared `Mutex`, so every transition
// (move, chain-jump end, chat, forfeit, disconnect) runs serialized; different
// matches have different locks and never block each other.
//
// Phases:
// - `AwaitMove`: the current player may move any of their pieces.
// - `ChainJumpPending { anchor }`: the current player just jumped and can jump
//   again. Only moves starting at `anchor` are accepted, and only jumps are
//   legal, until they jump again or send `END_CHAIN_JUMP`.
// - `GameOver`: terminal. Everything except chat relay is ignored, so the
//   end-of-match broadcast happens exactly once.
//
// Rejections for turn or continuity reasons never touch the counters; only a
// move the board refuses counts as an invalid attempt.
//
// Outbound messages go through each seat's `Outbox`, which only enqueues, so
// nothing here waits on a socket while the lock is held.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use halma_board::{Board, Cell, Player, is_jump};
use halma_protocol::{
    ClientMessage, GameStats, MoveCoords, PlayerStats, ServerMessage, TurnStatus,
};
use tracing::{debug, info};

use crate::connection::Outbox;

pub const NOT_YOUR_TURN: &str = "Não é o seu turno.";
pub const MUST_CONTINUE_CHAIN: &str = "Você deve continuar pulando com a mesma peça.";
pub const INVALID_MOVE: &str = "Movimento inválido.";
pub const NO_CHAIN_JUMP: &str = "Nenhum salto em cadeia ativo.";
pub const NAME_ALREADY_SET: &str = "Nome já definido.";
pub const YOU_FORFEITED: &str = "Você desistiu da partida.";

/// Winner description reported if a match somehow ends without one.
const UNEXPECTED_END: &str = "O jogo encerrou inesperadamente.";

/// A session shared between its two connections.
pub type SharedSession = Arc<Mutex<Session>>;

/// Lock a session, recovering the state if a previous holder panicked.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Server-assigned match number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match-{}", self.0)
    }
}

/// One player's side of a match.
pub struct Seat {
    name: String,
    outbox: Outbox,
    moves: u32,
    invalid_attempts: u32,
}

impl Seat {
    pub fn new(name: String, outbox: Outbox) -> Self {
        Self {
            name,
            outbox,
            moves: 0,
            invalid_attempts: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> PlayerStats {
        PlayerStats {
            moves: self.moves,
            invalid_attempts: self.invalid_attempts,
        }
    }

    fn send(&self, msg: &ServerMessage) {
        self.outbox.send(msg);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    AwaitMove,
    ChainJumpPending { anchor: Cell },
    GameOver,
}

/// How a match ended, from the winner's side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ending {
    ReachedTarget,
    OpponentForfeited,
    OpponentDisconnected,
}

pub struct Session {
    id: SessionId,
    seats: [Seat; 2],
    board: Board,
    current: Player,
    phase: Phase,
    chat_history: Vec<String>,
    winner_summary: String,
}

impl Session {
    /// A match on the standard starting board, player one to move.
    pub fn new(id: SessionId, player1: Seat, player2: Seat) -> Self {
        Self::with_board(id, player1, player2, Board::new())
    }

    pub fn with_board(id: SessionId, player1: Seat, player2: Seat, board: Board) -> Self {
        Self {
            id,
            seats: [player1, player2],
            board,
            current: Player::One,
            phase: Phase::AwaitMove,
            chat_history: Vec::new(),
            winner_summary: UNEXPECTED_END.into(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn chain_jump_anchor(&self) -> Option<Cell> {
        match self.phase {
            Phase::ChainJumpPending { anchor } => Some(anchor),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn seat(&self, player: Player) -> &Seat {
        &self.seats[player.index()]
    }

    pub fn chat_history(&self) -> &[String] {
        &self.chat_history
    }

    pub fn winner_summary(&self) -> &str {
        &self.winner_summary
    }

    /// The summary sent to both players when the match ends.
    pub fn stats(&self) -> GameStats {
        GameStats {
            winner: self.winner_summary.clone(),
            player1: self.seat(Player::One).stats(),
            player2: self.seat(Player::Two).stats(),
            chat_log: self.chat_history.clone(),
        }
    }

    /// Send the opening lines to both players.
    pub fn start(&mut self) {
        for player in Player::BOTH {
            let opponent = self.seat(player.opponent()).name.clone();
            let seat = self.seat(player);
            seat.send(&ServerMessage::Welcome { player });
            seat.send(&ServerMessage::OpponentFound { name: opponent });
            seat.send(&ServerMessage::GameStart);
        }
        self.announce_turn();
        info!(session = %self.id, "match started");
    }

    /// Apply one decoded message from the player in seat `from`.
    pub fn handle_message(&mut self, from: Player, msg: ClientMessage) {
        if self.is_over() {
            if let ClientMessage::Chat { text } = msg {
                self.relay_chat(from, text);
            }
            return;
        }

        match msg {
            ClientMessage::SetName { .. } => self.reply_error(from, NAME_ALREADY_SET),
            ClientMessage::Move(coords) => self.handle_move(from, coords),
            ClientMessage::GetValidMoves { cell } => self.handle_get_valid_moves(from, cell),
            ClientMessage::EndChainJump => self.handle_end_chain_jump(from),
            ClientMessage::Forfeit => {
                info!(session = %self.id, player = %from, "forfeit");
                self.end_match(from.opponent(), Ending::OpponentForfeited);
            }
            ClientMessage::Chat { text } => self.relay_chat(from, text),
        }
    }

    /// The connection in seat `from` is gone. Counts as a forfeit.
    pub fn handle_disconnect(&mut self, from: Player) {
        if self.is_over() {
            return;
        }
        info!(session = %self.id, player = %from, "player disconnected mid-match");
        self.end_match(from.opponent(), Ending::OpponentDisconnected);
    }

    fn handle_move(&mut self, from: Player, coords: MoveCoords) {
        if from != self.current {
            self.reply_error(from, NOT_YOUR_TURN);
            return;
        }
        let in_chain_jump = match self.phase {
            Phase::ChainJumpPending { anchor } if coords.from != anchor => {
                self.reply_error(from, MUST_CONTINUE_CHAIN);
                return;
            }
            Phase::ChainJumpPending { .. } => true,
            _ => false,
        };

        if !self
            .board
            .attempt_move(coords.from, coords.to, from, in_chain_jump)
        {
            self.seats[from.index()].invalid_attempts += 1;
            debug!(
            session = %self.id,
            player = %from,
            from = %coords.from,
            to = %coords.to,
            "move rejected"
        );
            self.reply_error(from, INVALID_MOVE);
            return;
        }

        self.seats[from.index()].moves += 1;
        debug!(
            session = %self.id,
            player = %from,
            from = %coords.from,
            to = %coords.to,
            "move accepted"
        );
        self.broadcast(&ServerMessage::UpdateScore {
            player1_moves: self.seat(Player::One).moves,
            player2_moves: self.seat(Player::Two).moves,
        });

        let mover = self.seat(from);
        let opponent = self.seat(from.opponent());
        if is_jump(coords.from, coords.to) && self.board.can_jump_again_from(coords.to) {
            mover.send(&ServerMessage::JumpMove(coords));
            opponent.send(&ServerMessage::OpponentMoved(coords));
            mover.send(&ServerMessage::ChainJumpOffer { cell: coords.to });
            self.phase = Phase::ChainJumpPending { anchor: coords.to };
        } else {
            mover.send(&ServerMessage::ValidMove(coords));
            opponent.send(&ServerMessage::OpponentMoved(coords));
            self.phase = Phase::AwaitMove;
            self.finish_turn(from);
        }
    }

    fn handle_get_valid_moves(&mut self, from: Player, cell: Cell) {
        if from != self.current {
            self.reply_error(from, NOT_YOUR_TURN);
            return;
        }
        let in_chain_jump = self.chain_jump_anchor().is_some();
        let cells = self.board.valid_destinations(cell, in_chain_jump);
        self.seat(from).send(&ServerMessage::ValidMovesList { cells });
    }

    fn handle_end_chain_jump(&mut self, from: Player) {
        if from != self.current {
            self.reply_error(from, NOT_YOUR_TURN);
            return;
        }
        if self.chain_jump_anchor().is_none() {
            self.reply_error(from, NO_CHAIN_JUMP);
            return;
        }
        self.phase = Phase::AwaitMove;
        self.finish_turn(from);
    }

    /// The mover's turn is complete: either they have won or play passes.
    fn finish_turn(&mut self, mover: Player) {
        if self.board.has_won(mover) {
            self.end_match(mover, Ending::ReachedTarget);
        } else {
            self.current = mover.opponent();
            self.announce_turn();
        }
    }

    fn announce_turn(&self) {
        for player in Player::BOTH {
            let status = if player == self.current {
                TurnStatus::YourTurn
            } else {
                TurnStatus::OpponentTurn
            };
            self.seat(player).send(&ServerMessage::SetTurn(status));
        }
    }

    /// Relay chat to both players. Only recorded while the match is live,
    /// since the log is published with the final stats.
    fn relay_chat(&mut self, from: Player, text: String) {
        let name = self.seat(from).name.clone();
        if !self.is_over() {
            self.chat_history.push(format!("{name}: {text}"));
        }
        self.broadcast(&ServerMessage::ChatMessage { name, text });
    }

    fn end_match(&mut self, winner: Player, ending: Ending) {
        if self.is_over() {
            return;
        }
        self.phase = Phase::GameOver;

        let winner_name = self.seat(winner).name.clone();
        self.winner_summary = match ending {
            Ending::ReachedTarget => format!("{winner_name} ganhou por chegar no destino!"),
            Ending::OpponentForfeited => {
                format!("{winner_name} ganhou pela desistência do oponente.")
            }
            Ending::OpponentDisconnected => {
                format!("{winner_name} ganhou pela desconexão do oponente.")
            }
        };
        info!(session = %self.id, summary = %self.winner_summary, "match over");

        self.broadcast(&ServerMessage::GameOverStats(self.stats()));

        let (win, loss) = match ending {
            Ending::ReachedTarget => (
                ServerMessage::Victory,
                Some(ServerMessage::Defeat { reason: None }),
            ),
            Ending::OpponentForfeited => (
                ServerMessage::OpponentForfeit,
                Some(ServerMessage::Defeat {
                    reason: Some(YOU_FORFEITED.into()),
                }),
            ),
            Ending::OpponentDisconnected => (ServerMessage::OpponentForfeit, None),
        };
        self.seat(winner).send(&win);
        if let Some(loss) = loss {
            self.seat(winner.opponent()).send(&loss);
        }
    }

    fn broadcast(&self, msg: &ServerMessage) {
        for seat in &self.seats {
            seat.send(msg);
        }
    }

    fn reply_error(&self, to: Player, text: &str) {
        self.seat(to).send(&ServerMessage::Error { text: text.into() });
    }
}
