use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::board::{Square, SquareSet};
use crate::config::SearchBudget;
use crate::error::SearchError;
use crate::evaluation::{Evaluator, TERMINAL_SCORE};
use crate::movegen::Move;
use crate::state::{GameState, Outcome, Undo};
use crate::transposition::{NodeType, Probe, TranspositionEntry, TranspositionTable, DEFAULT_TABLE_CAPACITY};

// Wider than any score the evaluator can produce
pub const SCORE_INFINITY: i32 = 1_000_000;

pub const DEFAULT_MTD_STEPS: u32 = 64;

// Retained tables keep entries searched at least this deep, minus the decay.
const RETAIN_MIN_DEPTH: u32 = 3;
const RETAIN_DECAY: u32 = 2;

const ITERATION_GROWTH: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    pub best_move: Move,
    pub score: i32,
    pub depth: u32,
    pub nodes: u64,
    pub table_hits: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Move(SearchReport),
    GameOver(Outcome),
}

impl Decision {
    pub fn best_move(&self) -> Option<Move> {
        match self {
            Decision::Move(report) => Some(report.best_move),
            Decision::GameOver(_) => None,
        }
    }
}

pub struct SearchEngine {
    evaluator: Evaluator,
    transposition_table: TranspositionTable,
    retain_table: bool,
    max_mtd_steps: u32,
    nodes_searched: u64,
    start_time: Instant,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::with_evaluator(Evaluator::new())
    }

    pub fn with_evaluator(evaluator: Evaluator) -> Self {
        Self {
            evaluator,
            transposition_table: TranspositionTable::new(DEFAULT_TABLE_CAPACITY),
            retain_table: false,
            max_mtd_steps: DEFAULT_MTD_STEPS,
            nodes_searched: 0,
            start_time: Instant::now(),
        }
    }

    pub fn retain_table(mut self, retain: bool) -> Self {
        self.retain_table = retain;
        self
    }

    pub fn set_max_mtd_steps(&mut self, steps: u32) {
        self.max_mtd_steps = steps.max(1);
    }

    pub fn table(&self) -> &TranspositionTable {
        &self.transposition_table
    }

    pub fn best_move(&mut self, state: &GameState, budget: &SearchBudget) -> Result<Decision, SearchError> {
        if let Some(outcome) = state.winner() {
            return Ok(Decision::GameOver(outcome));
        }
        if budget.max_depth == Some(0) {
            return Err(SearchError::Exhausted("max_depth is 0".to_string()));
        }

        self.nodes_searched = 0;
        self.start_time = Instant::now();
        let side = state.side_to_move();

        if state.must_pass() {
            info!(side = %side, "no legal move, passing");
            return Ok(Decision::Move(SearchReport {
                best_move: Move::Pass,
                score: self.evaluator.score(state, side),
                depth: 0,
                nodes: 0,
                table_hits: 0,
                elapsed: self.start_time.elapsed(),
            }));
        }

        self.prepare_table(budget.capacity());

        // Searching past the last empty square cannot change anything
        let full_depth = state.board().empty_count().max(1);
        let max_depth = budget.max_depth.unwrap_or(u32::MAX).min(full_depth);

        let mut root = state.clone();
        let mut guesses = [0i32; 2];
        let mut previous_best: Option<Square> = None;
        let mut report: Option<SearchReport> = None;
        let mut last_iteration = Duration::ZERO;

        for depth in 1..=max_depth {
            if report.is_some() && self.budget_exhausted(budget, last_iteration) {
                debug!(depth, "budget exhausted, stopping iterative deepening");
                break;
            }

            let iteration_start = Instant::now();
            let (score, best) = self.mtdf(&mut root, depth, guesses[(depth % 2) as usize], previous_best);
            last_iteration = iteration_start.elapsed();
            guesses[(depth % 2) as usize] = score;
            previous_best = Some(best);

            debug!(
                depth,
                score,
                best_move = %best,
                nodes = self.nodes_searched,
                elapsed_ms = self.start_time.elapsed().as_millis() as u64,
                "iteration complete"
            );

            report = Some(SearchReport {
                best_move: Move::Place(best),
                score,
                depth,
                nodes: self.nodes_searched,
                table_hits: self.transposition_table.hits(),
                elapsed: self.start_time.elapsed(),
            });

            // A decided game is proven and further depth cannot change it
            if score.abs() >= TERMINAL_SCORE {
                break;
            }
        }

        if self.retain_table {
            self.transposition_table.age(RETAIN_MIN_DEPTH, RETAIN_DECAY);
        }

        let report = report.ok_or_else(|| SearchError::Exhausted("no iteration completed".to_string()))?;
        info!(
            side = %side,
            best_move = %report.best_move,
            score = report.score,
            depth = report.depth,
            nodes = report.nodes,
            "search finished"
        );
        Ok(Decision::Move(report))
    }

    fn prepare_table(&mut self, capacity: usize) {
        if self.transposition_table.capacity() != capacity {
            self.transposition_table = TranspositionTable::new(capacity);
        } else if !self.retain_table {
            self.transposition_table.clear();
        }
        self.transposition_table.reset_stats();
    }

    fn budget_exhausted(&self, budget: &SearchBudget, last_iteration: Duration) -> bool {
        if let Some(limit) = budget.time_limit() {
            if !next_iteration_fits(self.start_time.elapsed(), limit, last_iteration) {
                return true;
            }
        }
        if let Some(nodes) = budget.node_limit {
            if self.nodes_searched >= nodes {
                return true;
            }
        }
        false
    }

    fn mtdf(&mut self, state: &mut GameState, depth: u32, first_guess: i32, first: Option<Square>) -> (i32, Square) {
        let mut guess = first_guess;
        let mut lower = -SCORE_INFINITY;
        let mut upper = SCORE_INFINITY;
        let mut proven: Option<Square> = None;
        let mut hint = first;
        let mut steps = 0;

        loop {
            if steps >= self.max_mtd_steps {
                warn!(depth, lower, upper, "MTD step limit reached, resolving with a full window");
                return self.search_root(state, depth, lower - 1, upper + 1, hint);
            }
            steps += 1;

            let beta = if guess == lower { guess + 1 } else { guess };
            let (score, mv) = self.search_root(state, depth, beta - 1, beta, hint);
            guess = score;
            hint = Some(mv);

            if score < beta {
                upper = score;
            } else {
                lower = score;
                proven = Some(mv);
            }

            if lower >= upper {
                // The last fail-high move is the one that reached the final value
                return (guess, proven.unwrap_or(mv));
            }
        }
    }

    fn search_root(
        &mut self,
        state: &mut GameState,
        depth: u32,
        alpha: i32,
        beta: i32,
        first: Option<Square>,
    ) -> (i32, Square) {
        self.nodes_searched += 1;

        let legal = state.legal_moves();
        let moves = self.order_moves(state, legal, first.map(Move::Place), depth);
        let mut alpha = alpha;
        let mut best_score = -SCORE_INFINITY;
        let mut best_move = moves[0];

        for square in moves {
            let undo = play(state, Move::Place(square));
            let score = -self.alpha_beta(state, depth - 1, -beta, -alpha);
            state.unmake_move(undo);

            if score > best_score {
                best_score = score;
                best_move = square;
            }
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }

        (best_score, best_move)
    }

    fn alpha_beta(&mut self, state: &mut GameState, depth: u32, alpha: i32, beta: i32) -> i32 {
        self.nodes_searched += 1;
        let side = state.side_to_move();

        if depth == 0 {
            return self.evaluator.score(state, side);
        }

        let moves = state.legal_moves();
        if moves.is_empty() && state.is_terminal() {
            return self.evaluator.score(state, side);
        }

        // Check transposition table
        let key = state.fingerprint();
        let (alpha, beta, hash_move) = match self.transposition_table.probe(&key, depth, alpha, beta) {
            Probe::Cutoff(score) => return score,
            Probe::Window { alpha, beta, best_move } => (alpha, beta, best_move),
        };

        let mut best_score = -SCORE_INFINITY;
        let mut best_move = None;

        if moves.is_empty() {
            // Forced pass keeps the remaining depth
            let undo = play(state, Move::Pass);
            best_score = -self.alpha_beta(state, depth, -beta, -alpha);
            state.unmake_move(undo);
            best_move = Some(Move::Pass);
        } else {
            let mut window_alpha = alpha;
            for square in self.order_moves(state, moves, hash_move, depth) {
                let undo = play(state, Move::Place(square));
                let score = -self.alpha_beta(state, depth - 1, -beta, -window_alpha);
                state.unmake_move(undo);

                if score > best_score {
                    best_score = score;
                    best_move = Some(Move::Place(square));
                }
                window_alpha = window_alpha.max(score);
                if window_alpha >= beta {
                    break;
                }
            }
        }

        // Classify against the window this node was actually searched with
        let node_type = if best_score <= alpha {
            NodeType::UpperBound
        } else if best_score >= beta {
            NodeType::LowerBound
        } else {
            NodeType::Exact
        };
        self.transposition_table.store(
            key,
            TranspositionEntry {
                depth,
                score: best_score,
                node_type,
                best_move,
            },
        );

        best_score
    }

    // Hash move first, then by static score; ties keep square order
    fn order_moves(&self, state: &mut GameState, moves: SquareSet, hash_move: Option<Move>, depth: u32) -> Vec<Square> {
        let mut ordered: Vec<Square> = if depth >= 2 {
            let mover = state.side_to_move();
            let mut scored: Vec<(i32, Square)> = moves
                .iter()
                .map(|square| {
                    let undo = play(state, Move::Place(square));
                    let score = self.evaluator.score(state, mover);
                    state.unmake_move(undo);
                    (score, square)
                })
                .collect();
            scored.sort_by(|a, b| b.0.cmp(&a.0));
            scored.into_iter().map(|(_, square)| square).collect()
        } else {
            moves.iter().collect()
        };

        if let Some(mv) = hash_move {
            let position = mv.square().and_then(|square| ordered.iter().position(|&s| s == square));
            match position {
                Some(index) => {
                    let square = ordered.remove(index);
                    ordered.insert(0, square);
                }
                None => panic!(
                    "stored best move {mv} is not legal for {} in position\n{}",
                    state.side_to_move(),
                    state.board()
                ),
            }
        }
        ordered
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        SearchEngine::new()
    }
}

// Each extra ply multiplies the work by roughly the branching factor
fn next_iteration_fits(elapsed: Duration, limit: Duration, last_iteration: Duration) -> bool {
    elapsed < limit && limit - elapsed >= last_iteration * ITERATION_GROWTH
}

// Failure means the search generated a move on corrupted state
fn play(state: &mut GameState, mv: Move) -> Undo {
    match state.make_move(mv) {
        Ok(undo) => undo,
        Err(err) => panic!("search produced an illegal move {mv}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Color};

    fn place(row: u8, col: u8) -> Move {
        Move::place(row, col).unwrap()
    }

    fn negamax(evaluator: &Evaluator, state: &mut GameState, depth: u32) -> i32 {
        let side = state.side_to_move();
        if depth == 0 || state.is_terminal() {
            return evaluator.score(state, side);
        }
        let moves = state.legal_moves();
        if moves.is_empty() {
            let undo = state.make_move(Move::Pass).unwrap();
            let score = -negamax(evaluator, state, depth);
            state.unmake_move(undo);
            return score;
        }
        let mut best = -SCORE_INFINITY;
        for square in moves {
            let undo = state.make_move(Move::Place(square)).unwrap();
            best = best.max(-negamax(evaluator, state, depth - 1));
            state.unmake_move(undo);
        }
        best
    }

    fn report(decision: Decision) -> SearchReport {
        match decision {
            Decision::Move(report) => report,
            Decision::GameOver(outcome) => panic!("unexpected game over: {outcome:?}"),
        }
    }

    fn midgame() -> GameState {
        GameState::from_moves(&[place(2, 3), place(2, 2), place(3, 2), place(4, 2), place(5, 3)]).unwrap()
    }

    #[test]
    fn test_depth_one_returns_opening_move() {
        let mut engine = SearchEngine::new();
        let state = GameState::new();
        let report = report(engine.best_move(&state, &SearchBudget::depth(1)).unwrap());
        assert_eq!(report.depth, 1);
        let square = report.best_move.square().unwrap();
        assert!(state.legal_moves().contains(square));
    }

    #[test]
    fn test_mtd_matches_plain_negamax() {
        let evaluator = Evaluator::new();
        for mut state in [GameState::new(), midgame()] {
            for depth in 1..=4 {
                let mut engine = SearchEngine::new();
                let report = report(engine.best_move(&state, &SearchBudget::depth(depth)).unwrap());
                assert_eq!(report.score, negamax(&evaluator, &mut state, depth), "depth {depth}");
            }
        }
    }

    #[test]
    fn test_best_move_achieves_reported_score() {
        let evaluator = Evaluator::new();
        let state = midgame();
        let mut engine = SearchEngine::new();
        let report = report(engine.best_move(&state, &SearchBudget::depth(3)).unwrap());
        let mut child = state.apply_move(report.best_move).unwrap();
        assert_eq!(-negamax(&evaluator, &mut child, 2), report.score);
    }

    #[test]
    fn test_step_limit_fallback_is_exact() {
        let evaluator = Evaluator::new();
        let mut state = midgame();
        let mut engine = SearchEngine::new();
        engine.set_max_mtd_steps(1);
        let report = report(engine.best_move(&state, &SearchBudget::depth(3)).unwrap());
        assert_eq!(report.score, negamax(&evaluator, &mut state, 3));
    }

    #[test]
    fn test_table_capacity_does_not_change_score() {
        let state = midgame();
        let mut large = SearchEngine::new();
        let mut tiny = SearchEngine::new();
        let mut none = SearchEngine::new();
        let budget = SearchBudget::depth(4);
        let a = report(large.best_move(&state, &budget).unwrap());
        let b = report(tiny.best_move(&state, &budget.with_table_capacity(4)).unwrap());
        let c = report(none.best_move(&state, &budget.with_table_capacity(0)).unwrap());
        assert_eq!(a.score, b.score);
        assert_eq!(a.score, c.score);
    }

    #[test]
    fn test_search_is_deterministic() {
        let state = midgame();
        let budget = SearchBudget::depth(4);
        let mut engine = SearchEngine::new();
        let first = report(engine.best_move(&state, &budget).unwrap());
        let second = report(engine.best_move(&state, &budget).unwrap());
        let fresh = report(SearchEngine::new().best_move(&state, &budget).unwrap());
        assert_eq!((first.best_move, first.score, first.nodes), (second.best_move, second.score, second.nodes));
        assert_eq!((first.best_move, first.score), (fresh.best_move, fresh.score));
    }

    #[test]
    fn test_terminal_state_reports_outcome() {
        let board: Board = format!("{}{}", "X".repeat(33), "O".repeat(31)).parse().unwrap();
        let state = GameState::from_board(board, Color::White);
        let decision = SearchEngine::new().best_move(&state, &SearchBudget::depth(3)).unwrap();
        assert_eq!(decision, Decision::GameOver(Outcome::Winner(Color::Black)));
        assert_eq!(decision.best_move(), None);
    }

    #[test]
    fn test_forced_pass() {
        let board: Board = format!("WB{}", ".".repeat(62)).parse().unwrap();
        let state = GameState::from_board(board, Color::Black);
        let decision = SearchEngine::new().best_move(&state, &SearchBudget::depth(3)).unwrap();
        assert_eq!(decision.best_move(), Some(Move::Pass));
    }

    #[test]
    fn test_zero_depth_is_exhausted() {
        let result = SearchEngine::new().best_move(&GameState::new(), &SearchBudget::depth(0));
        assert!(matches!(result, Err(SearchError::Exhausted(_))));
    }

    #[test]
    fn test_next_iteration_must_fit_grown_cost() {
        let ms = Duration::from_millis;
        assert!(next_iteration_fits(ms(0), ms(300), ms(100)));
        assert!(!next_iteration_fits(ms(100), ms(300), ms(100)));
        assert!(next_iteration_fits(ms(100), ms(1000), ms(100)));
        assert!(!next_iteration_fits(ms(300), ms(300), ms(0)));
        assert!(!next_iteration_fits(ms(400), ms(300), ms(0)));
    }

    #[test]
    fn test_node_limit_still_completes_depth_one() {
        let budget = SearchBudget::default().with_node_limit(1);
        let report = report(SearchEngine::new().best_move(&midgame(), &budget).unwrap());
        assert_eq!(report.depth, 1);
    }

    #[test]
    fn test_finds_winning_endgame() {
        // Black takes h1 and flips the whole top row, leaving White with no discs
        let board: Board = format!("XOOOOOO.{}", ".".repeat(56)).parse().unwrap();
        let state = GameState::from_board(board, Color::Black);
        let report = report(SearchEngine::new().best_move(&state, &SearchBudget::default()).unwrap());
        assert_eq!(report.best_move, place(0, 7));
        assert_eq!(report.score, TERMINAL_SCORE + 8);
    }

    #[test]
    fn test_retained_table_survives_between_calls() {
        let mut engine = SearchEngine::new().retain_table(true);
        let state = GameState::new();
        report(engine.best_move(&state, &SearchBudget::depth(5)).unwrap());
        assert!(!engine.table().is_empty());
        assert!(engine.table().len() <= DEFAULT_TABLE_CAPACITY);

        let mut fresh = SearchEngine::new();
        report(fresh.best_move(&state, &SearchBudget::depth(2)).unwrap());
        let retained_entries = fresh.table().len();
        report(fresh.best_move(&state, &SearchBudget::depth(2)).unwrap());
        assert_eq!(fresh.table().len(), retained_entries);
    }
}
