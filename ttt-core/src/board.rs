use serde::{Deserialize, Serialize};

use crate::{BOARD_SIZE, InvalidPlaceReason, TttBoardState, TttPos, WINNING_LINES};

/// A 3x3 grid where every cell is empty or holds the mark of the player who took it.
/// Serializes as a nested array of `null` or mark values, row by row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TttBoard<M> {
    cells: [[Option<M>; 3]; 3],
}

impl<M> Default for TttBoard<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> TttBoard<M> {
    pub fn new() -> Self {
        TttBoard {
            cells: std::array::from_fn(|_| std::array::from_fn(|_| None)),
        }
    }

    fn index(pos: &TttPos) -> Option<(usize, usize)> {
        if !pos.is_valid() {
            return None;
        }
        Some((pos.row as usize, pos.col as usize))
    }

    pub fn get(&self, pos: &TttPos) -> Option<&M> {
        let (row, col) = Self::index(pos)?;
        self.cells[row][col].as_ref()
    }

    pub fn rows(&self) -> &[[Option<M>; 3]; 3] {
        &self.cells
    }

    pub fn can_do_place(&self, pos: &TttPos) -> Result<(), InvalidPlaceReason> {
        let Some((row, col)) = Self::index(pos) else {
            return Err(InvalidPlaceReason::OutOfBounds);
        };
        if self.cells[row][col].is_some() {
            return Err(InvalidPlaceReason::PositionOccupied);
        }
        Ok(())
    }

    pub fn do_place(&mut self, pos: &TttPos, mark: M) -> Result<(), InvalidPlaceReason> {
        self.can_do_place(pos)?;
        let (row, col) = (pos.row as usize, pos.col as usize);
        self.cells[row][col] = Some(mark);
        Ok(())
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied_count() == (BOARD_SIZE * BOARD_SIZE) as usize
    }

    /// Empty cells in row-major order. Calling again starts over.
    pub fn valid_moves(&self) -> impl Iterator<Item = TttPos> + Clone + '_ {
        (0..BOARD_SIZE)
            .flat_map(|row| (0..BOARD_SIZE).map(move |col| TttPos::new(row, col)))
            .filter(move |pos| self.get(pos).is_none())
    }
}

impl<M: PartialEq> TttBoard<M> {
    pub fn has_line(&self, mark: &M) -> bool {
        WINNING_LINES
            .iter()
            .any(|line| line.iter().all(|pos| self.get(pos) == Some(mark)))
    }

    /// Evaluates the board right after `last_mover` placed a mark.
    pub fn evaluate(&self, last_mover: &M) -> TttBoardState<M>
    where
        M: Clone,
    {
        if self.has_line(last_mover) {
            TttBoardState::Win(last_mover.clone())
        } else if self.is_full() {
            TttBoardState::Draw
        } else {
            TttBoardState::Ongoing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_from(moves: &[(i32, i32, char)]) -> TttBoard<char> {
        let mut board = TttBoard::new();
        for &(row, col, mark) in moves {
            board
                .do_place(&TttPos::new(row, col), mark)
                .expect("placement should succeed");
        }
        board
    }

    #[test]
    fn test_place_and_reject_occupied() {
        let mut board = TttBoard::new();
        let pos = TttPos::new(1, 1);
        assert!(board.do_place(&pos, 'x').is_ok());
        assert_eq!(board.get(&pos), Some(&'x'));
        assert_eq!(
            board.do_place(&pos, 'o'),
            Err(InvalidPlaceReason::PositionOccupied)
        );
        assert_eq!(board.get(&pos), Some(&'x'));
        assert_eq!(board.occupied_count(), 1);
    }

    #[test]
    fn test_place_out_of_bounds() {
        let mut board = TttBoard::new();
        for (row, col) in [(-1, 0), (0, -1), (3, 0), (0, 3)] {
            assert_eq!(
                board.do_place(&TttPos::new(row, col), 'x'),
                Err(InvalidPlaceReason::OutOfBounds)
            );
        }
        assert!(board.do_place(&TttPos::new(0, 0), 'x').is_ok());
        assert!(board.do_place(&TttPos::new(2, 2), 'x').is_ok());
        assert_eq!(board.get(&TttPos::new(5, 5)), None);
    }

    #[test]
    fn test_every_line_wins() {
        for line in WINNING_LINES.iter() {
            let mut board = TttBoard::new();
            for pos in line {
                board.do_place(pos, 'x').unwrap();
            }
            assert!(board.has_line(&'x'));
            assert!(!board.has_line(&'o'));
            assert_eq!(board.evaluate(&'x'), TttBoardState::Win('x'));
        }
    }

    #[test]
    fn test_draw_on_full_board_without_line() {
        let board = board_from(&[
            (0, 0, 'x'),
            (0, 1, 'o'),
            (0, 2, 'x'),
            (1, 1, 'o'),
            (1, 0, 'x'),
            (1, 2, 'o'),
            (2, 1, 'x'),
            (2, 0, 'o'),
            (2, 2, 'x'),
        ]);
        assert!(board.is_full());
        assert!(!board.has_line(&'x'));
        assert!(!board.has_line(&'o'));
        assert_eq!(board.evaluate(&'x'), TttBoardState::Draw);
    }

    #[test]
    fn test_win_on_last_cell_beats_draw() {
        let board = board_from(&[
            (0, 0, 'x'),
            (0, 1, 'o'),
            (0, 2, 'x'),
            (1, 1, 'o'),
            (1, 0, 'x'),
            (1, 2, 'o'),
            (2, 1, 'x'),
            (2, 2, 'o'),
            (2, 0, 'x'),
        ]);
        assert!(board.is_full());
        assert_eq!(board.evaluate(&'x'), TttBoardState::Win('x'));
    }

    #[test]
    fn test_ongoing() {
        let board = board_from(&[(0, 0, 'x'), (1, 1, 'o')]);
        assert!(board.evaluate(&'o').is_ongoing());
    }

    #[test]
    fn test_valid_moves_row_major_and_restartable() {
        let board = board_from(&[(0, 1, 'x'), (1, 1, 'o'), (2, 0, 'x')]);
        let moves = board.valid_moves();
        let first: Vec<TttPos> = moves.clone().collect();
        let second: Vec<TttPos> = moves.collect();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                TttPos::new(0, 0),
                TttPos::new(0, 2),
                TttPos::new(1, 0),
                TttPos::new(1, 2),
                TttPos::new(2, 1),
                TttPos::new(2, 2),
            ]
        );
        assert_eq!(TttBoard::<char>::new().valid_moves().count(), 9);
    }

    #[test]
    fn test_serializes_as_nested_array() {
        let board = board_from(&[(0, 0, 'x'), (2, 1, 'o')]);
        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(
            json,
            serde_json::json!([["x", null, null], [null, null, null], [null, "o", null]])
        );
    }
}
