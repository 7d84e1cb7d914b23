mod board;

use serde::{Deserialize, Serialize};

pub use board::TttBoard;

pub const BOARD_SIZE: i32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TttPos {
    pub row: i32,
    pub col: i32,
}

impl TttPos {
    pub fn new(row: i32, col: i32) -> Self {
        TttPos { row, col }
    }

    pub fn is_valid(&self) -> bool {
        self.row >= 0 && self.row < BOARD_SIZE && self.col >= 0 && self.col < BOARD_SIZE
    }
}

/// The eight lines that win the game: three rows, three columns and both diagonals.
pub const WINNING_LINES: [[TttPos; 3]; 8] = [
    [TttPos { row: 0, col: 0 }, TttPos { row: 0, col: 1 }, TttPos { row: 0, col: 2 }],
    [TttPos { row: 1, col: 0 }, TttPos { row: 1, col: 1 }, TttPos { row: 1, col: 2 }],
    [TttPos { row: 2, col: 0 }, TttPos { row: 2, col: 1 }, TttPos { row: 2, col: 2 }],
    [TttPos { row: 0, col: 0 }, TttPos { row: 1, col: 0 }, TttPos { row: 2, col: 0 }],
    [TttPos { row: 0, col: 1 }, TttPos { row: 1, col: 1 }, TttPos { row: 2, col: 1 }],
    [TttPos { row: 0, col: 2 }, TttPos { row: 1, col: 2 }, TttPos { row: 2, col: 2 }],
    [TttPos { row: 0, col: 0 }, TttPos { row: 1, col: 1 }, TttPos { row: 2, col: 2 }],
    [TttPos { row: 0, col: 2 }, TttPos { row: 1, col: 1 }, TttPos { row: 2, col: 0 }],
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidPlaceReason {
    OutOfBounds,
    PositionOccupied,
}

impl std::fmt::Display for InvalidPlaceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidPlaceReason::OutOfBounds => write!(f, "position is out of bounds"),
            InvalidPlaceReason::PositionOccupied => write!(f, "position is already occupied"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TttBoardState<M> {
    Ongoing,
    Win(M),
    Draw,
}

impl<M> TttBoardState<M> {
    pub fn is_ongoing(&self) -> bool {
        matches!(self, TttBoardState::Ongoing)
    }
}
