// halma_board: board state and move rules for two-player Halma.
//
// This crate is the rules engine shared by the server and any client. It is
// pure logic: no sockets, no threads, no protocol knowledge.
//
// Module overview:
// - `types.rs`:  `Cell` (signed grid position), `Player` (seat one/two),
//                `Piece` (ownership tag).
// - `board.rs`:  `Board`: the grid, home corner layout, destination
//                queries, chain-jump continuation check, move validation,
//                unconditional relocation, and the win check.
//
// Design decisions:
// - **Signed cells.** Client-supplied coordinates may be negative or past the
//   edge; the board treats those as off-board instead of panicking.
// - **First-level jumps only.** `valid_destinations` never explores
//   multi-hop chains; the server offers chain continuation one jump at a time.

pub mod board;
pub mod types;

pub use board::{BOARD_SIZE, Board, BoardError, HOME_DEPTH, PIECES_PER_PLAYER, is_jump};
pub use types::{Cell, Piece, Player};
