// Core types shared by the board, the wire protocol, and the server.
//
// Defines grid positions (`Cell`), seat identity (`Player`), and the
// ownership tag placed on the board (`Piece`). All are small `Copy` values;
// `Cell` and `Player` also have a `Display` form for logging.
//
// `Cell` uses signed components: coordinates arrive from untrusted clients and
// neighbor arithmetic steps off the edge of the grid, so bounds are checked by
// `Board` rather than enforced by the type.

use std::fmt;

/// A position on the board, 0-indexed. `(0, 0)` is player one's corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The cell `(dr, dc)` away. May lie outside the board.
    pub const fn offset(self, dr: i32, dc: i32) -> Self {
        Self {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// King-move distance: the larger of the row and column deltas.
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        (self.row - other.row)
            .unsigned_abs()
            .max((self.col - other.col).unsigned_abs())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One of the two seats in a match. Player one moves first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub const BOTH: [Player; 2] = [Player::One, Player::Two];

    /// The 1-based number used on the wire (`WELCOME:1`).
    pub const fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }

    /// 0-based index for per-player arrays.
    pub const fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    pub const fn opponent(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.number())
    }
}

/// A piece on the board. Pieces are fungible; only the owner matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    owner: Player,
}

impl Piece {
    pub const fn new(owner: Player) -> Self {
        Self { owner }
    }

    pub const fn owner(self) -> Player {
        self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chebyshev_distance_uses_larger_delta() {
        let a = Cell::new(4, 0);
        assert_eq!(a.chebyshev_distance(Cell::new(3, 1)), 1);
        assert_eq!(a.chebyshev_distance(Cell::new(2, 0)), 2);
        assert_eq!(a.chebyshev_distance(Cell::new(2, 1)), 2);
        assert_eq!(a.chebyshev_distance(a), 0);
    }

    #[test]
    fn player_numbers_roundtrip_and_reject_unknown() {
        for player in Player::BOTH {
            assert_eq!(Player::from_number(player.number()), Some(player));
        }
        assert_eq!(Player::from_number(0), None);
        assert_eq!(Player::from_number(3), None);
    }

    #[test]
    fn opponent_is_an_involution() {
        assert_eq!(Player::One.opponent(), Player::Two);
        assert_eq!(Player::Two.opponent().opponent(), Player::Two);
    }
}
