use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Color, Square, SquareSet};
use crate::error::GameError;

pub const DIRECTIONS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const NOT_FIRST_COL: u64 = !0x0101_0101_0101_0101;
const NOT_LAST_COL: u64 = !0x8080_8080_8080_8080;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Place(Square),
    Pass,
}

impl Move {
    pub fn place(row: u8, col: u8) -> Option<Move> {
        Square::new(row, col).map(Move::Place)
    }

    pub fn square(self) -> Option<Square> {
        match self {
            Move::Place(square) => Some(square),
            Move::Pass => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Move::Place(square) => write!(f, "{square}"),
            Move::Pass => f.write_str("pass"),
        }
    }
}

impl FromStr for Move {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("pass") || s.eq_ignore_ascii_case("ps") {
            return Ok(Move::Pass);
        }
        s.parse().map(Move::Place)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveGenerator;

impl MoveGenerator {
    pub fn new() -> Self {
        Self
    }

    // 0 unless the run is closed by one of side's discs
    fn flips_in_direction(&self, board: &Board, side: Color, square: Square, dr: i8, dc: i8) -> u64 {
        let own = board.pieces(side);
        let opponent = board.pieces(side.opposite());

        let mut run = 0u64;
        let mut current = square.offset(dr, dc);
        while let Some(next) = current {
            let mask = next.mask();
            if opponent & mask != 0 {
                run |= mask;
            } else if own & mask != 0 {
                return run;
            } else {
                return 0;
            }
            current = next.offset(dr, dc);
        }
        0
    }

    pub fn flips(&self, board: &Board, side: Color, square: Square) -> SquareSet {
        if board.occupied() & square.mask() != 0 {
            return SquareSet::EMPTY;
        }
        let captured = DIRECTIONS
            .iter()
            .fold(0u64, |acc, &(dr, dc)| acc | self.flips_in_direction(board, side, square, dr, dc));
        SquareSet::from_mask(captured)
    }

    pub fn is_move_valid(&self, board: &Board, side: Color, square: Square) -> bool {
        if board.occupied() & square.mask() != 0 {
            return false;
        }
        DIRECTIONS
            .iter()
            .any(|&(dr, dc)| self.flips_in_direction(board, side, square, dr, dc) != 0)
    }

    pub fn generate_moves(&self, board: &Board, side: Color) -> SquareSet {
        // Only empty squares touching an opponent disc can capture anything
        let candidates = !board.occupied() & neighbours(board.pieces(side.opposite()));
        SquareSet::from_mask(candidates)
            .iter()
            .filter(|&square| self.is_move_valid(board, side, square))
            .collect()
    }
}

fn neighbours(mask: u64) -> u64 {
    let horizontal = ((mask << 1) & NOT_FIRST_COL) | ((mask >> 1) & NOT_LAST_COL);
    let vertical = (mask << 8) | (mask >> 8);
    let diagonal = ((mask << 9) & NOT_FIRST_COL)
        | ((mask << 7) & NOT_LAST_COL)
        | ((mask >> 7) & NOT_FIRST_COL)
        | ((mask >> 9) & NOT_LAST_COL);
    horizontal | vertical | diagonal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(row: u8, col: u8) -> Square {
        Square::new(row, col).unwrap()
    }

    #[test]
    fn test_opening_moves() {
        let board = Board::new();
        let moves: Vec<Square> = MoveGenerator::new().generate_moves(&board, Color::Black).iter().collect();
        assert_eq!(moves, vec![sq(2, 3), sq(3, 2), sq(4, 5), sq(5, 4)]);

        let white: Vec<Square> = board.legal_moves(Color::White).iter().collect();
        assert_eq!(white, vec![sq(2, 4), sq(3, 5), sq(4, 2), sq(5, 3)]);
    }

    #[test]
    fn test_flips_multiple_directions() {
        let board: Board = "
            ........
            .X.X.X..
            ..OOO...
            .XO.OX..
            ..OOO...
            .X.X.X..
            ........
            ........"
            .parse()
            .unwrap();
        let flips = board.flips(Color::Black, sq(3, 3));
        assert_eq!(flips.len(), 8);
        for (dr, dc) in DIRECTIONS {
            assert!(flips.contains(sq(3, 3).offset(dr, dc).unwrap()));
        }
    }

    #[test]
    fn test_run_must_be_closed_by_own_disc() {
        let board: Board = "
            OOOOOOO.
            ........
            ........
            ........
            ........
            ........
            ........
            ........"
            .parse()
            .unwrap();
        // The run reaches the edge without a Black disc behind it
        assert!(board.flips(Color::Black, sq(0, 7)).is_empty());
        assert!(board.legal_moves(Color::Black).is_empty());
    }

    #[test]
    fn test_no_wrap_around_edges() {
        // Black on h1, White on a2: adjacent in index order but not on the board
        let board: Board = "
            .......X
            O.......
            ........
            ........
            ........
            ........
            ........
            ........"
            .parse()
            .unwrap();
        assert!(board.legal_moves(Color::Black).is_empty());
        assert!(board.legal_moves(Color::White).is_empty());
    }

    #[test]
    fn test_occupied_square_is_never_legal() {
        let board = Board::new();
        assert!(!MoveGenerator::new().is_move_valid(&board, Color::Black, sq(3, 3)));
        assert!(board.flips(Color::Black, sq(3, 3)).is_empty());
    }

    #[test]
    fn test_move_notation() {
        assert_eq!(Move::place(2, 3).unwrap().to_string(), "d3");
        assert_eq!(Move::Pass.to_string(), "pass");
        assert_eq!("D3".parse::<Move>().unwrap(), Move::place(2, 3).unwrap());
        assert_eq!("PS".parse::<Move>().unwrap(), Move::Pass);
        assert_eq!(" pass ".parse::<Move>().unwrap(), Move::Pass);
        assert!("z9".parse::<Move>().is_err());
        assert_eq!(Move::place(8, 0), None);
    }
}
