use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::movegen::MoveGenerator;

pub const BOARD_SIZE: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opposite(&self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "Black",
            Color::White => "White",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Black,
    White,
}

impl Cell {
    fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Black => 'X',
            Cell::White => 'O',
        }
    }
}

// Text form is column letter then 1-based row: (2, 3) is d3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Square(u8);

impl Square {
    pub fn new(row: u8, col: u8) -> Option<Square> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Some(Square(row * BOARD_SIZE + col))
        } else {
            None
        }
    }

    pub fn from_index(index: u8) -> Option<Square> {
        if index < 64 {
            Some(Square(index))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn row(self) -> u8 {
        self.0 / BOARD_SIZE
    }

    pub fn col(self) -> u8 {
        self.0 % BOARD_SIZE
    }

    pub fn mask(self) -> u64 {
        1u64 << self.0
    }

    pub fn offset(self, dr: i8, dc: i8) -> Option<Square> {
        let row = self.row() as i8 + dr;
        let col = self.col() as i8 + dc;
        if (0..BOARD_SIZE as i8).contains(&row) && (0..BOARD_SIZE as i8).contains(&col) {
            Square::new(row as u8, col as u8)
        } else {
            None
        }
    }

    pub fn is_corner(self) -> bool {
        matches!(self.0, 0 | 7 | 56 | 63)
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square)
    }
}

impl TryFrom<u8> for Square {
    type Error = GameError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Square::from_index(index).ok_or_else(|| GameError::Parse(format!("square index {index} is off the board")))
    }
}

impl From<Square> for u8 {
    fn from(square: Square) -> u8 {
        square.0
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col()) as char, (b'1' + self.row()) as char)
    }
}

impl FromStr for Square {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        if bytes.len() != 2 {
            return Err(GameError::Parse(format!("invalid square '{s}'")));
        }
        let col = bytes[0].to_ascii_lowercase().wrapping_sub(b'a');
        let row = bytes[1].wrapping_sub(b'1');
        Square::new(row, col).ok_or_else(|| GameError::Parse(format!("invalid square '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SquareSet(u64);

impl SquareSet {
    pub const EMPTY: SquareSet = SquareSet(0);

    pub fn from_mask(mask: u64) -> Self {
        SquareSet(mask)
    }

    pub fn mask(self) -> u64 {
        self.0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, square: Square) -> bool {
        self.0 & square.mask() != 0
    }

    pub fn insert(&mut self, square: Square) {
        self.0 |= square.mask();
    }

    pub fn iter(self) -> SquareIter {
        SquareIter(self.0)
    }
}

impl IntoIterator for SquareSet {
    type Item = Square;
    type IntoIter = SquareIter;

    fn into_iter(self) -> SquareIter {
        self.iter()
    }
}

impl FromIterator<Square> for SquareSet {
    fn from_iter<I: IntoIterator<Item = Square>>(iter: I) -> Self {
        let mut set = SquareSet::EMPTY;
        for square in iter {
            set.insert(square);
        }
        set
    }
}

pub struct SquareIter(u64);

impl Iterator for SquareIter {
    type Item = Square;

    fn next(&mut self) -> Option<Square> {
        if self.0 == 0 {
            return None;
        }
        let index = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Some(Square(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    black: u64,
    white: u64,
}

impl Board {
    pub fn new() -> Self {
        let d4 = 1u64 << (3 * 8 + 3);
        let e4 = 1u64 << (3 * 8 + 4);
        let d5 = 1u64 << (4 * 8 + 3);
        let e5 = 1u64 << (4 * 8 + 4);
        Self {
            black: e4 | d5,
            white: d4 | e5,
        }
    }

    pub fn empty() -> Self {
        Self { black: 0, white: 0 }
    }

    pub fn from_masks(black: u64, white: u64) -> Result<Self, GameError> {
        if black & white != 0 {
            return Err(GameError::Parse(format!(
                "squares {:#018x} are claimed by both players",
                black & white
            )));
        }
        Ok(Self { black, white })
    }

    pub fn pieces(&self, side: Color) -> u64 {
        match side {
            Color::Black => self.black,
            Color::White => self.white,
        }
    }

    pub fn occupied(&self) -> u64 {
        self.black | self.white
    }

    pub fn cell(&self, square: Square) -> Cell {
        let mask = square.mask();
        if self.black & mask != 0 {
            Cell::Black
        } else if self.white & mask != 0 {
            Cell::White
        } else {
            Cell::Empty
        }
    }

    pub fn set_cell(&mut self, square: Square, cell: Cell) {
        let mask = square.mask();
        self.black &= !mask;
        self.white &= !mask;
        match cell {
            Cell::Black => self.black |= mask,
            Cell::White => self.white |= mask,
            Cell::Empty => {}
        }
    }

    pub fn legal_moves(&self, side: Color) -> SquareSet {
        MoveGenerator::new().generate_moves(self, side)
    }

    pub fn has_legal_move(&self, side: Color) -> bool {
        !self.legal_moves(side).is_empty()
    }

    pub fn flips(&self, side: Color, square: Square) -> SquareSet {
        MoveGenerator::new().flips(self, side, square)
    }

    pub fn apply_move(&mut self, side: Color, square: Square) -> Result<SquareSet, GameError> {
        let flips = self.flips(side, square);
        if flips.is_empty() {
            return Err(GameError::InvalidMove { square, side });
        }

        let flipped = flips.mask();
        match side {
            Color::Black => {
                self.black |= flipped | square.mask();
                self.white &= !flipped;
            }
            Color::White => {
                self.white |= flipped | square.mask();
                self.black &= !flipped;
            }
        }
        Ok(flips)
    }

    // Inverse of apply_move given the flips it returned
    pub fn undo_move(&mut self, side: Color, square: Square, flips: SquareSet) {
        let flipped = flips.mask();
        match side {
            Color::Black => {
                self.black &= !(flipped | square.mask());
                self.white |= flipped;
            }
            Color::White => {
                self.white &= !(flipped | square.mask());
                self.black |= flipped;
            }
        }
    }

    pub fn disc_count(&self, side: Color) -> u32 {
        self.pieces(side).count_ones()
    }

    pub fn empty_count(&self) -> u32 {
        64 - self.occupied().count_ones()
    }

    pub fn is_full(&self) -> bool {
        self.occupied() == u64::MAX
    }

    pub fn to_rows(&self) -> Vec<String> {
        (0..BOARD_SIZE)
            .map(|row| {
                (0..BOARD_SIZE)
                    .filter_map(|col| Square::new(row, col))
                    .map(|square| self.cell(square).symbol())
                    .collect()
            })
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl FromStr for Board {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut board = Board::empty();
        let mut index = 0u8;
        for ch in s.chars().filter(|c| !c.is_whitespace()) {
            let cell = match ch {
                'X' | 'x' | 'B' | 'b' => Cell::Black,
                'O' | 'o' | 'W' | 'w' => Cell::White,
                '.' | '-' => Cell::Empty,
                other => return Err(GameError::Parse(format!("unexpected board symbol '{other}'"))),
            };
            let square = Square::from_index(index)
                .ok_or_else(|| GameError::Parse("board diagram has more than 64 cells".to_string()))?;
            board.set_cell(square, cell);
            index += 1;
        }
        if index != 64 {
            return Err(GameError::Parse(format!("board diagram has {index} cells, expected 64")));
        }
        Ok(board)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.to_rows() {
            let spaced: Vec<String> = row.chars().map(String::from).collect();
            writeln!(f, "{}", spaced.join(" "))?;
        }
        Ok(())
    }
}
