use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Color, SquareSet};
use crate::error::GameError;
use crate::movegen::Move;
use crate::zobrist::{Fingerprint, ZobristKeys};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Winner(Color),
    Draw,
}

// Only valid for the most recent make_move on the state that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Undo {
    mv: Move,
    flips: SquareSet,
    passes: u8,
    hash: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GameSnapshot", into = "GameSnapshot")]
pub struct GameState {
    board: Board,
    side_to_move: Color,
    passes: u8,
    move_number: u32,
    history: Vec<Move>,
    hash: u64,
}

impl GameState {
    pub fn new() -> Self {
        Self::from_board(Board::new(), Color::Black)
    }

    pub fn from_board(board: Board, side_to_move: Color) -> Self {
        Self {
            board,
            side_to_move,
            passes: 0,
            move_number: 0,
            history: Vec::new(),
            hash: ZobristKeys::get().hash(&board, side_to_move),
        }
    }

    pub fn from_moves(moves: &[Move]) -> Result<Self, GameError> {
        let mut state = GameState::new();
        for &mv in moves {
            state.make_move(mv)?;
        }
        Ok(state)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn passes(&self) -> u8 {
        self.passes
    }

    pub fn move_number(&self) -> u32 {
        self.move_number
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.hash, &self.board, self.side_to_move)
    }

    pub fn legal_moves(&self) -> SquareSet {
        self.board.legal_moves(self.side_to_move)
    }

    pub fn must_pass(&self) -> bool {
        !self.is_terminal() && self.legal_moves().is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.board.is_full()
            || self.passes >= 2
            || (!self.board.has_legal_move(Color::Black) && !self.board.has_legal_move(Color::White))
    }

    pub fn winner(&self) -> Option<Outcome> {
        if !self.is_terminal() {
            return None;
        }
        let black = self.board.disc_count(Color::Black);
        let white = self.board.disc_count(Color::White);
        Some(match black.cmp(&white) {
            std::cmp::Ordering::Greater => Outcome::Winner(Color::Black),
            std::cmp::Ordering::Less => Outcome::Winner(Color::White),
            std::cmp::Ordering::Equal => Outcome::Draw,
        })
    }

    pub fn make_move(&mut self, mv: Move) -> Result<Undo, GameError> {
        if self.passes >= 2 || self.board.is_full() {
            return Err(GameError::GameOver);
        }

        let side = self.side_to_move;
        let keys = ZobristKeys::get();
        let undo_hash = self.hash;
        let undo_passes = self.passes;

        let flips = match mv {
            Move::Place(square) => {
                let flips = self.board.apply_move(side, square)?;
                self.hash ^= keys.placement_delta(side, square, flips);
                self.passes = 0;
                flips
            }
            Move::Pass => {
                if self.board.has_legal_move(side) {
                    return Err(GameError::IllegalPass { side });
                }
                if !self.board.has_legal_move(side.opposite()) {
                    return Err(GameError::GameOver);
                }
                self.hash ^= keys.pass_delta();
                self.passes += 1;
                SquareSet::EMPTY
            }
        };

        self.side_to_move = side.opposite();
        self.move_number += 1;
        self.history.push(mv);

        Ok(Undo {
            mv,
            flips,
            passes: undo_passes,
            hash: undo_hash,
        })
    }

    pub fn unmake_move(&mut self, undo: Undo) {
        debug_assert_eq!(self.history.last(), Some(&undo.mv), "undo does not match the last move");

        let mover = self.side_to_move.opposite();
        if let Move::Place(square) = undo.mv {
            self.board.undo_move(mover, square, undo.flips);
        }
        self.side_to_move = mover;
        self.passes = undo.passes;
        self.hash = undo.hash;
        self.move_number -= 1;
        self.history.pop();
    }

    pub fn apply_move(&self, mv: Move) -> Result<GameState, GameError> {
        let mut next = self.clone();
        next.make_move(mv)?;
        Ok(next)
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GameSnapshot {
    board: Vec<String>,
    side_to_move: Color,
    passes: u8,
    move_number: u32,
    history: Vec<Move>,
}

impl From<GameState> for GameSnapshot {
    fn from(state: GameState) -> Self {
        Self {
            board: state.board.to_rows(),
            side_to_move: state.side_to_move,
            passes: state.passes,
            move_number: state.move_number,
            history: state.history,
        }
    }
}

impl TryFrom<GameSnapshot> for GameState {
    type Error = GameError;

    fn try_from(snapshot: GameSnapshot) -> Result<Self, Self::Error> {
        if snapshot.board.len() != 8 {
            return Err(GameError::Snapshot(format!("expected 8 board rows, found {}", snapshot.board.len())));
        }
        if let Some(row) = snapshot.board.iter().find(|row| row.chars().count() != 8) {
            return Err(GameError::Snapshot(format!("board row '{row}' is not 8 cells wide")));
        }
        let board = Board::from_str(&snapshot.board.concat()).map_err(|err| GameError::Snapshot(err.to_string()))?;
        if snapshot.passes > 2 {
            return Err(GameError::Snapshot(format!("pass counter {} exceeds 2", snapshot.passes)));
        }
        if (snapshot.history.len() as u64) > u64::from(snapshot.move_number) {
            return Err(GameError::Snapshot(format!(
                "history holds {} moves but move number is {}",
                snapshot.history.len(),
                snapshot.move_number
            )));
        }

        let mut state = GameState::from_board(board, snapshot.side_to_move);
        state.passes = snapshot.passes;
        state.move_number = snapshot.move_number;
        state.history = snapshot.history;
        Ok(state)
    }
}
