use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::board::{Board, Color, Square, SquareSet};

const ZOBRIST_SEED: u64 = 0x0de1_10a7_5eed_2024;

static KEYS: OnceLock<ZobristKeys> = OnceLock::new();

pub struct ZobristKeys {
    discs: [[u64; 2]; 64],
    white_to_move: u64,
}

impl ZobristKeys {
    fn generate(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut discs = [[0u64; 2]; 64];
        for square in discs.iter_mut() {
            square[0] = rng.gen();
            square[1] = rng.gen();
        }
        Self {
            discs,
            white_to_move: rng.gen(),
        }
    }

    pub fn get() -> &'static ZobristKeys {
        KEYS.get_or_init(|| ZobristKeys::generate(ZOBRIST_SEED))
    }

    pub fn disc(&self, square: Square, color: Color) -> u64 {
        self.discs[square.index()][color as usize]
    }

    pub fn side(&self, side: Color) -> u64 {
        match side {
            Color::Black => 0,
            Color::White => self.white_to_move,
        }
    }

    pub fn hash(&self, board: &Board, side: Color) -> u64 {
        let mut hash = self.side(side);
        for color in [Color::Black, Color::White] {
            for square in SquareSet::from_mask(board.pieces(color)) {
                hash ^= self.disc(square, color);
            }
        }
        hash
    }

    pub fn placement_delta(&self, side: Color, square: Square, flips: SquareSet) -> u64 {
        let opponent = side.opposite();
        let mut delta = self.disc(square, side) ^ self.white_to_move;
        for flipped in flips {
            delta ^= self.disc(flipped, side) ^ self.disc(flipped, opponent);
        }
        delta
    }

    pub fn pass_delta(&self) -> u64 {
        self.white_to_move
    }
}

// Hashes by the Zobrist value only; equality compares the full position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    hash: u64,
    black: u64,
    white: u64,
    side: Color,
}

impl Fingerprint {
    pub fn new(hash: u64, board: &Board, side: Color) -> Self {
        Self {
            hash,
            black: board.pieces(Color::Black),
            white: board.pieces(Color::White),
            side,
        }
    }
}

impl Hash for Fingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}
