// Protocol messages for client-server communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by game clients to the server.
// - `ServerMessage`: sent by the server to game clients.
//
// Supporting structs (`MoveCoords`, `GameStats`, `PlayerStats`) and the
// `TurnStatus` flag carry the typed payloads. Conversion to and from wire
// lines lives in `codec.rs`; this module is plain data.

use halma_board::{Cell, Player};

/// Messages sent by a client to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    /// Handshake. Must be the first line on a new connection.
    SetName { name: String },
    /// Move a piece.
    Move(MoveCoords),
    /// Ask for the legal destinations of the piece at `cell`.
    GetValidMoves { cell: Cell },
    /// Decline to continue a chain jump and pass the turn.
    EndChainJump,
    /// Concede the match.
    Forfeit,
    /// Chat message (free text, may contain the separator).
    Chat { text: String },
}

/// Messages sent by the server to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    /// Paired; tells the client which seat it holds.
    Welcome { player: Player },
    /// Name of the opponent this client was paired with.
    OpponentFound { name: String },
    GameStart,
    SetTurn(TurnStatus),
    /// Accepted move counts for both players.
    UpdateScore {
        player1_moves: u32,
        player2_moves: u32,
    },
    /// The client's own move was accepted and the chain (if any) is over.
    ValidMove(MoveCoords),
    /// The client's own jump was accepted and a further jump is available.
    JumpMove(MoveCoords),
    /// The opponent moved a piece.
    OpponentMoved(MoveCoords),
    /// The client may keep jumping with the piece at `cell`.
    ChainJumpOffer { cell: Cell },
    /// Reply to `GetValidMoves`.
    ValidMovesList { cells: Vec<Cell> },
    Victory,
    Defeat { reason: Option<String> },
    OpponentForfeit,
    /// End-of-match summary, sent to both players before the outcome.
    GameOverStats(GameStats),
    /// Chat relayed from either player, including the sender's own.
    ChatMessage { name: String, text: String },
    Error { text: String },
    Info { text: String },
}

/// Source and destination of a move, as sent in `MOVE` and echoed back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveCoords {
    pub from: Cell,
    pub to: Cell,
}

impl MoveCoords {
    pub const fn new(from: Cell, to: Cell) -> Self {
        Self { from, to }
    }
}

/// Whose turn it is, from the receiving client's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnStatus {
    YourTurn,
    OpponentTurn,
}

/// Per-player counters reported at the end of a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub moves: u32,
    pub invalid_attempts: u32,
}

/// End-of-match summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameStats {
    /// Human-readable description of who won and how.
    pub winner: String,
    pub player1: PlayerStats,
    pub player2: PlayerStats,
    /// Chat lines in the order sent, each `"<name>: <text>"`.
    pub chat_log: Vec<String>,
}
