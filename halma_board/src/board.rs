// The Halma board and its move rules.
//
// `Board` is a square grid of optional `Piece`s. Each player starts with 15
// pieces packed into a triangular home corner (player one near `(0, 0)`,
// player two near `(size-1, size-1)`) and wins by filling the opponent's home
// corner with their own pieces.
//
// Move rules:
// - A step moves one cell in any of the 8 directions onto an empty cell.
// - A jump moves two cells in one direction over an occupied neighbor (either
//   player's piece) onto an empty landing cell.
// - During a chain jump only jumps are legal. The engine reports first-level
//   jumps only; continuing a chain is decided one jump at a time by the
//   caller via `can_jump_again_from`.
//
// Home corners are computed once at construction from the board size and
// `HOME_DEPTH`, so the win check is a scan over a precomputed cell list.
//
// No I/O and no interior mutability: the server wraps a `Board` inside its
// per-match lock.

use thiserror::Error;

use crate::types::{Cell, Piece, Player};

/// Side length of the standard board.
pub const BOARD_SIZE: i32 = 10;

/// Rows in a home corner triangle. Cells with `row + col < HOME_DEPTH`
/// (measured from the player's own corner) belong to the corner.
pub const HOME_DEPTH: i32 = 5;

/// Pieces each player starts with: the triangle number of `HOME_DEPTH`.
pub const PIECES_PER_PLAYER: usize = (HOME_DEPTH * (HOME_DEPTH + 1) / 2) as usize;

/// The 8 king-move directions, scanned in row-major order.
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("board size {size} is too small (minimum {min})")]
    TooSmall { size: i32, min: i32 },

    #[error("cell {0} is outside the board")]
    OutOfBounds(Cell),
}

/// Returns true if moving between the two cells covers more than one step.
pub fn is_jump(from: Cell, to: Cell) -> bool {
    from.chebyshev_distance(to) > 1
}

/// Boards are only built through the constructors, so `cells` always
/// matches `size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: i32,
    cells: Vec<Option<Piece>>,
    /// Home corner cells, indexed by `Player::index()`.
    homes: [Vec<Cell>; 2],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// The standard 10x10 board with both players in their home corners.
    pub fn new() -> Self {
        let mut board = Self::build(BOARD_SIZE);
        board.fill_home_corners();
        board
    }

    /// A board of the given size with both players in their home corners.
    pub fn with_size(size: i32) -> Result<Self, BoardError> {
        let mut board = Self::empty(size)?;
        board.fill_home_corners();
        Ok(board)
    }

    /// A board with no pieces. Useful for setting up positions by hand.
    pub fn empty(size: i32) -> Result<Self, BoardError> {
        // The two corners must not overlap.
        let min = HOME_DEPTH + 1;
        if size < min {
            return Err(BoardError::TooSmall { size, min });
        }
        Ok(Self::build(size))
    }

    fn build(size: i32) -> Self {
        let cell_count = (size * size) as usize;
        Self {
            size,
            cells: vec![None; cell_count],
            homes: [
                home_corner_cells(Player::One, size),
                home_corner_cells(Player::Two, size),
            ],
        }
    }

    fn fill_home_corners(&mut self) {
        let homes = self.homes.clone();
        for player in Player::BOTH {
            for &cell in &homes[player.index()] {
                if let Some(idx) = self.index(cell) {
                    self.cells[idx] = Some(Piece::new(player));
                }
            }
        }
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row >= 0 && cell.row < self.size && cell.col >= 0 && cell.col < self.size
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.row * self.size + cell.col) as usize)
    }

    /// The piece at `cell`, or `None` if the cell is empty or off the board.
    pub fn piece_at(&self, cell: Cell) -> Option<Piece> {
        self.index(cell).and_then(|idx| self.cells[idx])
    }

    /// True if `cell` is on the board and holds no piece.
    pub fn is_vacant(&self, cell: Cell) -> bool {
        self.index(cell).is_some_and(|idx| self.cells[idx].is_none())
    }

    /// Put `piece` (or nothing) at `cell`, replacing whatever was there.
    pub fn set(&mut self, cell: Cell, piece: Option<Piece>) -> Result<(), BoardError> {
        let idx = self.index(cell).ok_or(BoardError::OutOfBounds(cell))?;
        self.cells[idx] = piece;
        Ok(())
    }

    /// The cells `player` starts in.
    pub fn home_corner(&self, player: Player) -> &[Cell] {
        &self.homes[player.index()]
    }

    /// The cells `player` must fill to win: the opponent's home corner.
    pub fn target_corner(&self, player: Player) -> &[Cell] {
        self.home_corner(player.opponent())
    }

    /// All occupied cells with their pieces, in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Cell, Piece)> + '_ {
        let size = self.size;
        self.cells.iter().enumerate().filter_map(move |(idx, slot)| {
            let idx = idx as i32;
            slot.map(|piece| (Cell::new(idx / size, idx % size), piece))
        })
    }

    pub fn piece_count(&self, player: Player) -> usize {
        self.pieces()
            .filter(|(_, piece)| piece.owner() == player)
            .count()
    }

    /// Landing cell for a jump from `from` in direction `(dr, dc)`, if the
    /// neighbor in that direction is occupied and the landing cell is vacant.
    fn jump_landing(&self, from: Cell, (dr, dc): (i32, i32)) -> Option<Cell> {
        let over = from.offset(dr, dc);
        let landing = from.offset(dr * 2, dc * 2);
        (self.piece_at(over).is_some() && self.is_vacant(landing)).then_some(landing)
    }

    /// Every cell the piece at `from` may move to right now. Steps are
    /// omitted while `in_chain_jump` is set. Empty if `from` holds no piece.
    pub fn valid_destinations(&self, from: Cell, in_chain_jump: bool) -> Vec<Cell> {
        let mut destinations = Vec::new();
        if self.piece_at(from).is_none() {
            return destinations;
        }

        if !in_chain_jump {
            destinations.extend(
                DIRECTIONS
                    .iter()
                    .map(|&(dr, dc)| from.offset(dr, dc))
                    .filter(|&cell| self.is_vacant(cell)),
            );
        }

        destinations.extend(
            DIRECTIONS
                .iter()
                .filter_map(|&dir| self.jump_landing(from, dir)),
        );
        destinations
    }

    /// True if the piece at `cell` has at least one jump available.
    pub fn can_jump_again_from(&self, cell: Cell) -> bool {
        self.piece_at(cell).is_some()
            && DIRECTIONS
                .iter()
                .any(|&dir| self.jump_landing(cell, dir).is_some())
    }

    /// Move `player`'s piece from `from` to `to` if the move is legal.
    /// Returns false and leaves the board untouched otherwise.
    pub fn attempt_move(
        &mut self,
        from: Cell,
        to: Cell,
        player: Player,
        in_chain_jump: bool,
    ) -> bool {
        match self.piece_at(from) {
            Some(piece) if piece.owner() == player => {}
            _ => return false,
        }
        if !self.valid_destinations(from, in_chain_jump).contains(&to) {
            return false;
        }
        self.relocate(from, to);
        true
    }

    /// Move whatever sits at `from` to `to` without checking the rules.
    /// No-op if `from` is empty or either cell is off the board.
    pub fn relocate(&mut self, from: Cell, to: Cell) {
        let (Some(src), Some(dst)) = (self.index(from), self.index(to)) else {
            return;
        };
        if let Some(piece) = self.cells[src].take() {
            self.cells[dst] = Some(piece);
        }
    }

    /// True if every cell of the opponent's home corner holds one of
    /// `player`'s pieces.
    pub fn has_won(&self, player: Player) -> bool {
        self.target_corner(player)
            .iter()
            .all(|&cell| self.piece_at(cell).is_some_and(|piece| piece.owner() == player))
    }
}

/// The triangular home corner for `player` on a board of side `size`.
fn home_corner_cells(player: Player, size: i32) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(PIECES_PER_PLAYER);
    for r in 0..HOME_DEPTH {
        for c in 0..HOME_DEPTH - r {
            cells.push(match player {
                Player::One => Cell::new(r, c),
                Player::Two => Cell::new(size - 1 - r, size - 1 - c),
            });
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sorted(mut cells: Vec<Cell>) -> Vec<Cell> {
        cells.sort();
        cells
    }

    fn cells(pairs: &[(i32, i32)]) -> Vec<Cell> {
        sorted(pairs.iter().map(|&(r, c)| Cell::new(r, c)).collect())
    }

    fn place(board: &mut Board, row: i32, col: i32, owner: Player) {
        board.set(Cell::new(row, col), Some(Piece::new(owner))).unwrap();
    }

    #[test]
    fn standard_setup_fills_both_home_corners() {
        let board = Board::new();
        assert_eq!(board.size(), BOARD_SIZE);
        for player in Player::BOTH {
            assert_eq!(board.piece_count(player), PIECES_PER_PLAYER);
            assert_eq!(board.home_corner(player).len(), PIECES_PER_PLAYER);
            for &cell in board.home_corner(player) {
                assert_eq!(board.piece_at(cell), Some(Piece::new(player)));
            }
        }
        assert_eq!(board.pieces().count(), 2 * PIECES_PER_PLAYER);
    }

    #[test]
    fn home_corners_are_the_expected_triangles() {
        let board = Board::new();
        assert!(board.home_corner(Player::One).contains(&Cell::new(4, 0)));
        assert!(board.home_corner(Player::One).contains(&Cell::new(0, 4)));
        assert!(!board.home_corner(Player::One).contains(&Cell::new(3, 2)));
        assert!(board.home_corner(Player::Two).contains(&Cell::new(9, 9)));
        assert!(board.home_corner(Player::Two).contains(&Cell::new(5, 9)));
        assert!(!board.home_corner(Player::Two).contains(&Cell::new(6, 7)));
        assert_eq!(board.target_corner(Player::One), board.home_corner(Player::Two));
    }

    #[test]
    fn too_small_board_is_rejected() {
        assert_eq!(
            Board::empty(5).unwrap_err(),
            BoardError::TooSmall { size: 5, min: 6 }
        );
        assert!(Board::with_size(6).is_ok());
    }

    #[test]
    fn set_outside_board_is_rejected() {
        let mut board = Board::new();
        let cell = Cell::new(-1, 3);
        assert_eq!(board.set(cell, None), Err(BoardError::OutOfBounds(cell)));
    }

    #[test]
    fn edge_piece_steps_into_open_neighbors_only() {
        let board = Board::new();
        assert_eq!(
            sorted(board.valid_destinations(Cell::new(4, 0), false)),
            cells(&[(4, 1), (5, 0), (5, 1)])
        );
    }

    #[test]
    fn jumps_over_own_pieces_are_offered() {
        let board = Board::new();
        // (3,0) can step to (4,1), jump (4,0) to (5,0), jump (3,1) to (3,2).
        assert_eq!(
            sorted(board.valid_destinations(Cell::new(3, 0), false)),
            cells(&[(3, 2), (4, 1), (5, 0)])
        );
    }

    #[test]
    fn chain_jump_suppresses_steps() {
        let board = Board::new();
        assert_eq!(
            sorted(board.valid_destinations(Cell::new(3, 0), true)),
            cells(&[(3, 2), (5, 0)])
        );
    }

    #[test]
    fn jumps_over_opponent_pieces_and_stop_at_blocked_landings() {
        let mut board = Board::empty(BOARD_SIZE).unwrap();
        place(&mut board, 4, 4, Player::One);
        place(&mut board, 4, 5, Player::Two);
        place(&mut board, 3, 3, Player::Two);
        place(&mut board, 2, 2, Player::One);

        let jumps = board.valid_destinations(Cell::new(4, 4), true);
        // Over (4,5) to (4,6); (3,3) is jumpable but (2,2) is occupied.
        assert_eq!(jumps, vec![Cell::new(4, 6)]);
    }

    #[test]
    fn empty_cell_has_no_destinations() {
        let board = Board::new();
        assert!(board.valid_destinations(Cell::new(5, 5), false).is_empty());
        assert!(board.valid_destinations(Cell::new(-3, 20), false).is_empty());
        assert!(!board.can_jump_again_from(Cell::new(5, 5)));
    }

    #[test]
    fn destinations_are_always_vacant_and_in_bounds() {
        let mut scattered = Board::empty(BOARD_SIZE).unwrap();
        for (i, (r, c)) in [(0, 0), (0, 1), (1, 1), (5, 5), (6, 5), (9, 8), (8, 8), (2, 7)]
            .into_iter()
            .enumerate()
        {
            let owner = if i % 2 == 0 { Player::One } else { Player::Two };
            place(&mut scattered, r, c, owner);
        }

        for board in [Board::new(), scattered] {
            for (cell, _) in board.pieces() {
                for in_chain in [false, true] {
                    for dest in board.valid_destinations(cell, in_chain) {
                        assert!(board.in_bounds(dest), "{dest} off board");
                        assert!(board.is_vacant(dest), "{dest} occupied");
                        if in_chain {
                            assert!(is_jump(cell, dest));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn can_jump_again_matches_jump_destinations() {
        let board = Board::new();
        for (cell, _) in board.pieces() {
            assert_eq!(
                board.can_jump_again_from(cell),
                !board.valid_destinations(cell, true).is_empty(),
                "mismatch at {cell}"
            );
        }
    }

    #[test]
    fn attempt_move_rejects_without_mutation() {
        let mut board = Board::new();
        let before = board.clone();

        // Empty source.
        assert!(!board.attempt_move(Cell::new(5, 5), Cell::new(5, 6), Player::One, false));
        // Wrong owner.
        assert!(!board.attempt_move(Cell::new(9, 9), Cell::new(8, 7), Player::One, false));
        // Occupied destination.
        assert!(!board.attempt_move(Cell::new(4, 0), Cell::new(3, 1), Player::One, false));
        // Too far.
        assert!(!board.attempt_move(Cell::new(4, 0), Cell::new(7, 0), Player::One, false));
        // Step during a chain jump.
        assert!(!board.attempt_move(Cell::new(4, 0), Cell::new(5, 0), Player::One, true));
        // Off the board.
        assert!(!board.attempt_move(Cell::new(4, 0), Cell::new(4, -1), Player::One, false));

        assert_eq!(board, before);
    }

    #[test]
    fn successful_move_relocates_exactly_one_piece() {
        let mut board = Board::new();
        let from = Cell::new(3, 0);
        let to = Cell::new(5, 0);
        assert!(board.attempt_move(from, to, Player::One, false));

        assert_eq!(board.piece_at(from), None);
        assert_eq!(board.piece_at(to), Some(Piece::new(Player::One)));
        assert_eq!(board.piece_count(Player::One), PIECES_PER_PLAYER);
        assert_eq!(board.piece_count(Player::Two), PIECES_PER_PLAYER);

        let changed = Board::new()
            .pieces()
            .filter(|&(cell, piece)| board.piece_at(cell) != Some(piece))
            .count();
        assert_eq!(changed, 1);
        assert!(is_jump(from, to));
        // Jumping back over (4,0) is possible from the landing cell.
        assert!(board.can_jump_again_from(to));
    }

    #[test]
    fn relocate_ignores_empty_source_and_off_board_cells() {
        let mut board = Board::new();
        let before = board.clone();
        board.relocate(Cell::new(5, 5), Cell::new(6, 6));
        board.relocate(Cell::new(0, 0), Cell::new(-1, 0));
        assert_eq!(board, before);

        board.relocate(Cell::new(9, 9), Cell::new(5, 5));
        assert_eq!(board.piece_at(Cell::new(5, 5)), Some(Piece::new(Player::Two)));
        assert_eq!(board.piece_at(Cell::new(9, 9)), None);
    }

    #[test]
    fn has_won_requires_every_target_cell() {
        let mut board = Board::empty(BOARD_SIZE).unwrap();
        let target: Vec<Cell> = board.target_corner(Player::One).to_vec();
        let (last, rest) = target.split_last().unwrap();
        for &cell in rest {
            board.set(cell, Some(Piece::new(Player::One))).unwrap();
        }
        assert!(!board.has_won(Player::One));

        board.set(*last, Some(Piece::new(Player::Two))).unwrap();
        assert!(!board.has_won(Player::One));

        board.set(*last, Some(Piece::new(Player::One))).unwrap();
        assert!(board.has_won(Player::One));
        assert!(!board.has_won(Player::Two));
    }

    #[test]
    fn fresh_board_has_no_winner() {
        let board = Board::new();
        assert!(!board.has_won(Player::One));
        assert!(!board.has_won(Player::Two));
    }
}
