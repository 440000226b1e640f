use crate::board::{Board, Color, Square, SquareSet};
use crate::state::GameState;

// Every heuristic score stays well below a decided game
pub const TERMINAL_SCORE: i32 = 100_000;

const CORNERS: [(u8, u8); 4] = [(0, 0), (0, 7), (7, 0), (7, 7)];

pub struct Evaluator {
    // Positional weights, row-major from a1. Corners high, X/C-squares negative.
    pub position_weights: [[i32; 8]; 8],
    // Weight of an X/C-square once its corner is taken
    pub settled_corner_neighbour_weight: i32,

    // Disc differential, heavier once few squares remain
    pub disc_weight: i32,
    pub endgame_disc_weight: i32,
    pub endgame_empties: u32,

    // Per legal move of difference
    pub mobility_weight: i32,

    // Per edge disc anchored on an owned corner
    pub stability_weight: i32,
    // Per disc the opponent could flip next move
    pub unstable_weight: i32,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            position_weights: [
                [100, -10, 11, 6, 6, 11, -10, 100],
                [-10, -20, 1, 2, 2, 1, -20, -10],
                [10, 1, 5, 4, 4, 5, 1, 10],
                [6, 2, 4, 2, 2, 4, 2, 6],
                [6, 2, 4, 2, 2, 4, 2, 6],
                [10, 1, 5, 4, 4, 5, 1, 10],
                [-10, -20, 1, 2, 2, 1, -20, -10],
                [100, -10, 11, 6, 6, 11, -10, 100],
            ],
            settled_corner_neighbour_weight: 4,
            disc_weight: 1,
            endgame_disc_weight: 4,
            endgame_empties: 20,
            mobility_weight: 8,
            stability_weight: 12,
            unstable_weight: 4,
        }
    }

    pub fn score(&self, state: &GameState, perspective: Color) -> i32 {
        let black_view = if state.is_terminal() {
            terminal_score(state.board())
        } else {
            self.evaluate(state.board())
        };

        match perspective {
            Color::Black => black_view,
            Color::White => -black_view,
        }
    }

    // Black's point of view
    pub fn evaluate(&self, board: &Board) -> i32 {
        let mut score = 0;

        // Positional weights
        for square in SquareSet::from_mask(board.pieces(Color::Black)) {
            score += self.square_weight(board, square);
        }
        for square in SquareSet::from_mask(board.pieces(Color::White)) {
            score -= self.square_weight(board, square);
        }

        score += self.evaluate_discs(board);
        score += self.evaluate_mobility(board);
        score += self.evaluate_stability(board);
        score += self.evaluate_instability(board);

        score
    }

    fn square_weight(&self, board: &Board, square: Square) -> i32 {
        if let Some(corner) = guarding_corner(square) {
            if board.occupied() & corner.mask() != 0 {
                return self.settled_corner_neighbour_weight;
            }
        }
        self.position_weights[square.row() as usize][square.col() as usize]
    }

    fn evaluate_discs(&self, board: &Board) -> i32 {
        let diff = board.disc_count(Color::Black) as i32 - board.disc_count(Color::White) as i32;
        let weight = if board.empty_count() <= self.endgame_empties {
            self.endgame_disc_weight
        } else {
            self.disc_weight
        };
        diff * weight
    }

    fn evaluate_mobility(&self, board: &Board) -> i32 {
        let black = board.legal_moves(Color::Black).len() as i32;
        let white = board.legal_moves(Color::White).len() as i32;
        (black - white) * self.mobility_weight
    }

    fn evaluate_stability(&self, board: &Board) -> i32 {
        let black = stable_edge_discs(board, Color::Black).len() as i32;
        let white = stable_edge_discs(board, Color::White).len() as i32;
        (black - white) * self.stability_weight
    }

    fn evaluate_instability(&self, board: &Board) -> i32 {
        let black = unstable_discs(board, Color::Black).len() as i32;
        let white = unstable_discs(board, Color::White).len() as i32;
        (white - black) * self.unstable_weight
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

fn terminal_score(board: &Board) -> i32 {
    let diff = board.disc_count(Color::Black) as i32 - board.disc_count(Color::White) as i32;
    match diff.signum() {
        1 => TERMINAL_SCORE + diff,
        -1 => -TERMINAL_SCORE + diff,
        _ => 0,
    }
}

fn guarding_corner(square: Square) -> Option<Square> {
    let near = |v: u8| v <= 1 || v >= 6;
    if square.is_corner() || !near(square.row()) || !near(square.col()) {
        return None;
    }
    let row = if square.row() < 4 { 0 } else { 7 };
    let col = if square.col() < 4 { 0 } else { 7 };
    Square::new(row, col)
}

// Edge discs joined to an owned corner by an unbroken line of own discs can never be flipped
fn stable_edge_discs(board: &Board, side: Color) -> SquareSet {
    let own = board.pieces(side);
    let mut stable = SquareSet::EMPTY;

    for (row, col) in CORNERS {
        let Some(corner) = Square::new(row, col) else {
            continue;
        };
        if own & corner.mask() == 0 {
            continue;
        }
        let dr: i8 = if row == 0 { 1 } else { -1 };
        let dc: i8 = if col == 0 { 1 } else { -1 };
        for (step_r, step_c) in [(dr, 0), (0, dc)] {
            let mut current = Some(corner);
            while let Some(square) = current {
                if own & square.mask() == 0 {
                    break;
                }
                stable.insert(square);
                current = square.offset(step_r, step_c);
            }
        }
    }
    stable
}

fn unstable_discs(board: &Board, side: Color) -> SquareSet {
    let opponent = side.opposite();
    let mask = board
        .legal_moves(opponent)
        .iter()
        .fold(0, |mask, square| mask | board.flips(opponent, square).mask());
    SquareSet::from_mask(mask)
}
