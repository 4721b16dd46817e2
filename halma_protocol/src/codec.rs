// Text encoding and decoding for protocol messages.
//
// Wire shape: `COMMAND` or `COMMAND:field1:field2...`. Fields are joined by
// `SEPARATOR`. The only field allowed to contain the separator is the final
// free-text field of a message (chat text, error text, names in
// `OPPONENT_FOUND`, the stats chat log); decoding splits with a field limit so
// that trailing text stays intact.
//
// Decoding is strict about arity and integer syntax and reports problems as a
// `DecodeError` rather than panicking. The server answers any decode error
// with a generic "malformed command" error line and otherwise ignores it.

use std::str::FromStr;

use halma_board::{Cell, Player};
use thiserror::Error;

use crate::message::{
    ClientMessage, GameStats, MoveCoords, PlayerStats, ServerMessage, TurnStatus,
};

/// Field separator between the command and each field.
pub const SEPARATOR: char = ':';

/// Separator between chat entries inside the `GAME_OVER_STATS` chat log.
pub const CHAT_LOG_SEPARATOR: &str = "|";

/// Command names as they appear on the wire.
pub mod command {
    pub const SET_NAME: &str = "SET_NAME";
    pub const MOVE: &str = "MOVE";
    pub const GET_VALID_MOVES: &str = "GET_VALID_MOVES";
    pub const END_CHAIN_JUMP: &str = "END_CHAIN_JUMP";
    pub const FORFEIT: &str = "FORFEIT";
    pub const CHAT: &str = "CHAT";

    pub const WELCOME: &str = "WELCOME";
    pub const OPPONENT_FOUND: &str = "OPPONENT_FOUND";
    pub const GAME_START: &str = "GAME_START";
    pub const SET_TURN: &str = "SET_TURN";
    pub const UPDATE_SCORE: &str = "UPDATE_SCORE";
    pub const VALID_MOVE: &str = "VALID_MOVE";
    pub const JUMP_MOVE: &str = "JUMP_MOVE";
    pub const OPPONENT_MOVED: &str = "OPPONENT_MOVED";
    pub const CHAIN_JUMP_OFFER: &str = "CHAIN_JUMP_OFFER";
    pub const VALID_MOVES_LIST: &str = "VALID_MOVES_LIST";
    pub const VICTORY: &str = "VICTORY";
    pub const DEFEAT: &str = "DEFEAT";
    pub const OPPONENT_FORFEIT: &str = "OPPONENT_FORFEIT";
    pub const GAME_OVER_STATS: &str = "GAME_OVER_STATS";
    pub const CHAT_MESSAGE: &str = "CHAT_MESSAGE";
    pub const ERROR: &str = "ERROR";
    pub const INFO: &str = "INFO";
}

const YOUR_TURN: &str = "YOUR_TURN";
const OPPONENT_TURN: &str = "OPPONENT_TURN";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty line")]
    Empty,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("`{command}` expects {expected} field(s), got {found}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("`{command}` field `{value}` is not a valid {expected}")]
    InvalidField {
        command: &'static str,
        value: String,
        expected: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Accumulates `COMMAND:field:field...`.
struct LineBuilder {
    line: String,
}

impl LineBuilder {
    fn new(command: &str) -> Self {
        Self {
            line: command.to_owned(),
        }
    }

    fn field(mut self, value: impl std::fmt::Display) -> Self {
        use std::fmt::Write;
        self.line.push(SEPARATOR);
        // Writing into a String cannot fail.
        let _ = write!(self.line, "{value}");
        self
    }

    fn cell(self, cell: Cell) -> Self {
        self.field(cell.row).field(cell.col)
    }

    fn coords(self, coords: MoveCoords) -> Self {
        self.cell(coords.from).cell(coords.to)
    }

    fn finish(self) -> String {
        self.line
    }
}

impl ClientMessage {
    /// Encode as a single wire line (without the newline).
    pub fn encode(&self) -> String {
        let builder = match self {
            ClientMessage::SetName { name } => LineBuilder::new(command::SET_NAME).field(name),
            ClientMessage::Move(coords) => LineBuilder::new(command::MOVE).coords(*coords),
            ClientMessage::GetValidMoves { cell } => {
                LineBuilder::new(command::GET_VALID_MOVES).cell(*cell)
            }
            ClientMessage::EndChainJump => LineBuilder::new(command::END_CHAIN_JUMP),
            ClientMessage::Forfeit => LineBuilder::new(command::FORFEIT),
            ClientMessage::Chat { text } => LineBuilder::new(command::CHAT).field(text),
        };
        builder.finish()
    }

    /// Decode a wire line (without the newline).
    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        let (name, rest) = split_command(line)?;
        match name {
            command::SET_NAME => Ok(ClientMessage::SetName {
                name: free_text(command::SET_NAME, rest)?.to_owned(),
            }),
            command::MOVE => {
                let fields = fixed_fields(command::MOVE, rest, 4)?;
                Ok(ClientMessage::Move(parse_coords(command::MOVE, &fields)?))
            }
            command::GET_VALID_MOVES => {
                let fields = fixed_fields(command::GET_VALID_MOVES, rest, 2)?;
                Ok(ClientMessage::GetValidMoves {
                    cell: parse_cell(command::GET_VALID_MOVES, fields[0], fields[1])?,
                })
            }
            command::END_CHAIN_JUMP => {
                fixed_fields(command::END_CHAIN_JUMP, rest, 0)?;
                Ok(ClientMessage::EndChainJump)
            }
            command::FORFEIT => {
                fixed_fields(command::FORFEIT, rest, 0)?;
                Ok(ClientMessage::Forfeit)
            }
            command::CHAT => Ok(ClientMessage::Chat {
                text: free_text(command::CHAT, rest)?.to_owned(),
            }),
            other => Err(DecodeError::UnknownCommand(other.to_owned())),
        }
    }
}

impl ServerMessage {
    /// Encode as a single wire line (without the newline).
    pub fn encode(&self) -> String {
        let builder = match self {
            ServerMessage::Welcome { player } => {
                LineBuilder::new(command::WELCOME).field(player.number())
            }
            ServerMessage::OpponentFound { name } => {
                LineBuilder::new(command::OPPONENT_FOUND).field(name)
            }
            ServerMessage::GameStart => LineBuilder::new(command::GAME_START),
            ServerMessage::SetTurn(status) => {
                let value = match status {
                    TurnStatus::YourTurn => YOUR_TURN,
                    TurnStatus::OpponentTurn => OPPONENT_TURN,
                };
                LineBuilder::new(command::SET_TURN).field(value)
            }
            ServerMessage::UpdateScore {
                player1_moves,
                player2_moves,
            } => LineBuilder::new(command::UPDATE_SCORE)
                .field(player1_moves)
                .field(player2_moves),
            ServerMessage::ValidMove(coords) => {
                LineBuilder::new(command::VALID_MOVE).coords(*coords)
            }
            ServerMessage::JumpMove(coords) => LineBuilder::new(command::JUMP_MOVE).coords(*coords),
            ServerMessage::OpponentMoved(coords) => {
                LineBuilder::new(command::OPPONENT_MOVED).coords(*coords)
            }
            ServerMessage::ChainJumpOffer { cell } => {
                LineBuilder::new(command::CHAIN_JUMP_OFFER).cell(*cell)
            }
            ServerMessage::ValidMovesList { cells } => {
                let list = cells
                    .iter()
                    .map(|c| format!("{},{}", c.row, c.col))
                    .collect::<Vec<_>>()
                    .join(";");
                LineBuilder::new(command::VALID_MOVES_LIST).field(list)
            }
            ServerMessage::Victory => LineBuilder::new(command::VICTORY),
            ServerMessage::Defeat { reason } => {
                let builder = LineBuilder::new(command::DEFEAT);
                match reason {
                    Some(reason) => builder.field(reason),
                    None => builder,
                }
            }
            ServerMessage::OpponentForfeit => LineBuilder::new(command::OPPONENT_FORFEIT),
            ServerMessage::GameOverStats(stats) => LineBuilder::new(command::GAME_OVER_STATS)
                .field(&stats.winner)
                .field(stats.player1.moves)
                .field(stats.player1.invalid_attempts)
                .field(stats.player2.moves)
                .field(stats.player2.invalid_attempts)
                .field(stats.chat_log.join(CHAT_LOG_SEPARATOR)),
            ServerMessage::ChatMessage { name, text } => {
                LineBuilder::new(command::CHAT_MESSAGE).field(format!("{name}: {text}"))
            }
            ServerMessage::Error { text } => LineBuilder::new(command::ERROR).field(text),
            ServerMessage::Info { text } => LineBuilder::new(command::INFO).field(text),
        };
        builder.finish()
    }

    /// Decode a wire line (without the newline).
    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        let (name, rest) = split_command(line)?;
        match name {
            command::WELCOME => {
                let fields = fixed_fields(command::WELCOME, rest, 1)?;
                let number: u8 = parse_int(command::WELCOME, fields[0])?;
                let player = Player::from_number(number).ok_or_else(|| DecodeError::InvalidField {
                    command: command::WELCOME,
                    value: fields[0].to_owned(),
                    expected: "player number",
                })?;
                Ok(ServerMessage::Welcome { player })
            }
            command::OPPONENT_FOUND => Ok(ServerMessage::OpponentFound {
                name: free_text(command::OPPONENT_FOUND, rest)?.to_owned(),
            }),
            command::GAME_START => {
                fixed_fields(command::GAME_START, rest, 0)?;
                Ok(ServerMessage::GameStart)
            }
            command::SET_TURN => {
                let fields = fixed_fields(command::SET_TURN, rest, 1)?;
                let status = match fields[0] {
                    YOUR_TURN => TurnStatus::YourTurn,
                    OPPONENT_TURN => TurnStatus::OpponentTurn,
                    other => {
                        return Err(DecodeError::InvalidField {
                            command: command::SET_TURN,
                            value: other.to_owned(),
                            expected: "turn status",
                        });
                    }
                };
                Ok(ServerMessage::SetTurn(status))
            }
            command::UPDATE_SCORE => {
                let fields = fixed_fields(command::UPDATE_SCORE, rest, 2)?;
                Ok(ServerMessage::UpdateScore {
                    player1_moves: parse_int(command::UPDATE_SCORE, fields[0])?,
                    player2_moves: parse_int(command::UPDATE_SCORE, fields[1])?,
                })
            }
            command::VALID_MOVE => {
                let fields = fixed_fields(command::VALID_MOVE, rest, 4)?;
                Ok(ServerMessage::ValidMove(parse_coords(command::VALID_MOVE, &fields)?))
            }
            command::JUMP_MOVE => {
                let fields = fixed_fields(command::JUMP_MOVE, rest, 4)?;
                Ok(ServerMessage::JumpMove(parse_coords(command::JUMP_MOVE, &fields)?))
            }
            command::OPPONENT_MOVED => {
                let fields = fixed_fields(command::OPPONENT_MOVED, rest, 4)?;
                Ok(ServerMessage::OpponentMoved(parse_coords(
                    command::OPPONENT_MOVED,
                    &fields,
                )?))
            }
            command::CHAIN_JUMP_OFFER => {
                let fields = fixed_fields(command::CHAIN_JUMP_OFFER, rest, 2)?;
                Ok(ServerMessage::ChainJumpOffer {
                    cell: parse_cell(command::CHAIN_JUMP_OFFER, fields[0], fields[1])?,
                })
            }
            command::VALID_MOVES_LIST => {
                let list = free_text(command::VALID_MOVES_LIST, rest)?;
                Ok(ServerMessage::ValidMovesList {
                    cells: parse_cell_list(list)?,
                })
            }
            command::VICTORY => {
                fixed_fields(command::VICTORY, rest, 0)?;
                Ok(ServerMessage::Victory)
            }
            command::DEFEAT => Ok(ServerMessage::Defeat {
                reason: rest.map(str::to_owned),
            }),
            command::OPPONENT_FORFEIT => {
                fixed_fields(command::OPPONENT_FORFEIT, rest, 0)?;
                Ok(ServerMessage::OpponentForfeit)
            }
            command::GAME_OVER_STATS => decode_stats(rest),
            command::CHAT_MESSAGE => {
                let body = free_text(command::CHAT_MESSAGE, rest)?;
                let (name, text) = body.split_once(SEPARATOR).ok_or(DecodeError::WrongArity {
                    command: command::CHAT_MESSAGE,
                    expected: 2,
                    found: 1,
                })?;
                Ok(ServerMessage::ChatMessage {
                    name: name.to_owned(),
                    text: text.strip_prefix(' ').unwrap_or(text).to_owned(),
                })
            }
            command::ERROR => Ok(ServerMessage::Error {
                text: free_text(command::ERROR, rest)?.to_owned(),
            }),
            command::INFO => Ok(ServerMessage::Info {
                text: free_text(command::INFO, rest)?.to_owned(),
            }),
            other => Err(DecodeError::UnknownCommand(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding helpers
// ---------------------------------------------------------------------------

/// Split off the command name. `rest` is `None` when the line has no
/// separator at all, and `Some("")` for a trailing separator.
fn split_command(line: &str) -> Result<(&str, Option<&str>), DecodeError> {
    if line.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(match line.split_once(SEPARATOR) {
        Some((name, rest)) => (name, Some(rest)),
        None => (line, None),
    })
}

/// All fields after the command; the count must be exactly `expected`.
fn fixed_fields<'a>(
    command: &'static str,
    rest: Option<&'a str>,
    expected: usize,
) -> Result<Vec<&'a str>, DecodeError> {
    let fields: Vec<&str> = match rest {
        Some(rest) => rest.split(SEPARATOR).collect(),
        None => Vec::new(),
    };
    if fields.len() != expected {
        return Err(DecodeError::WrongArity {
            command,
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// A single free-text field that may itself contain the separator.
fn free_text<'a>(command: &'static str, rest: Option<&'a str>) -> Result<&'a str, DecodeError> {
    rest.ok_or(DecodeError::WrongArity {
        command,
        expected: 1,
        found: 0,
    })
}

fn parse_int<T: FromStr>(command: &'static str, value: &str) -> Result<T, DecodeError> {
    value.trim().parse().map_err(|_| DecodeError::InvalidField {
        command,
        value: value.to_owned(),
        expected: "integer",
    })
}

fn parse_cell(command: &'static str, row: &str, col: &str) -> Result<Cell, DecodeError> {
    Ok(Cell::new(parse_int(command, row)?, parse_int(command, col)?))
}

fn parse_coords(command: &'static str, fields: &[&str]) -> Result<MoveCoords, DecodeError> {
    Ok(MoveCoords::new(
        parse_cell(command, fields[0], fields[1])?,
        parse_cell(command, fields[2], fields[3])?,
    ))
}

/// `row,col;row,col;...`, or the empty string for no cells.
fn parse_cell_list(list: &str) -> Result<Vec<Cell>, DecodeError> {
    if list.is_empty() {
        return Ok(Vec::new());
    }
    list.split(';')
        .map(|pair| {
            let (row, col) = pair.split_once(',').ok_or_else(|| DecodeError::InvalidField {
                command: command::VALID_MOVES_LIST,
                value: pair.to_owned(),
                expected: "row,col pair",
            })?;
            parse_cell(command::VALID_MOVES_LIST, row, col)
        })
        .collect()
}

fn decode_stats(rest: Option<&str>) -> Result<ServerMessage, DecodeError> {
    const COMMAND: &str = command::GAME_OVER_STATS;
    let rest = free_text(COMMAND, rest)?;
    let fields: Vec<&str> = rest.splitn(6, SEPARATOR).collect();
    if fields.len() != 6 {
        return Err(DecodeError::WrongArity {
            command: COMMAND,
            expected: 6,
            found: fields.len(),
        });
    }
    let chat_log = if fields[5].is_empty() {
        Vec::new()
    } else {
        fields[5]
            .split(CHAT_LOG_SEPARATOR)
            .map(str::to_owned)
            .collect()
    };
    Ok(ServerMessage::GameOverStats(GameStats {
        winner: fields[0].to_owned(),
        player1: PlayerStats {
            moves: parse_int(COMMAND, fields[1])?,
            invalid_attempts: parse_int(COMMAND, fields[2])?,
        },
        player2: PlayerStats {
            moves: parse_int(COMMAND, fields[3])?,
            invalid_attempts: parse_int(COMMAND, fields[4])?,
        },
        chat_log,
    }))
}
