// halma_protocol: wire protocol for the Halma game server.
//
// This crate defines the message types, text codec, and line framing used by
// the server (`halma_server`) and game clients to communicate over TCP. It is
// shared between both sides and depends only on `halma_board` for the cell
// and player types carried in message payloads.
//
// Module overview:
// - `message.rs`:  Client-to-server and server-to-client message enums, plus
//                  supporting structs (`MoveCoords`, `GameStats`).
// - `codec.rs`:    `encode`/`decode` between messages and `COMMAND:field...`
//                  text lines; `DecodeError` for malformed input.
// - `framing.rs`:  Newline-delimited framing over any `BufRead`/`Write`
//                  stream, with a maximum line length.
//
// Design decisions:
// - **Typed messages, textual wire.** The wire format is plain text so it can
//   be driven by hand from `nc`; the rest of the server only ever sees the
//   enums and dispatches with exhaustive matches.
// - **No async runtime.** Uses `std::io` traits for framing, compatible with
//   both blocking TCP streams and buffered wrappers.

pub mod codec;
pub mod framing;
pub mod message;

pub use codec::{CHAT_LOG_SEPARATOR, DecodeError, SEPARATOR};
pub use framing::{MAX_LINE_LENGTH, read_line, write_line};
pub use message::{
    ClientMessage, GameStats, MoveCoords, PlayerStats, ServerMessage, TurnStatus,
};
