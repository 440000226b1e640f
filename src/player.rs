use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::board::Color;
use crate::config::SearchBudget;
use crate::movegen::Move;
use crate::search::{Decision, SearchEngine};
use crate::state::{GameState, Outcome};

pub trait Player {
    fn name(&self) -> &str;

    fn choose_move(&mut self, state: &GameState) -> Result<Move>;
}

pub struct SearchPlayer {
    name: String,
    engine: SearchEngine,
    budget: SearchBudget,
}

impl SearchPlayer {
    pub fn new(name: impl Into<String>, budget: SearchBudget) -> Self {
        Self::with_engine(name, SearchEngine::new(), budget)
    }

    pub fn with_engine(name: impl Into<String>, engine: SearchEngine, budget: SearchBudget) -> Self {
        Self {
            name: name.into(),
            engine,
            budget,
        }
    }
}

impl Player for SearchPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, state: &GameState) -> Result<Move> {
        let decision = self
            .engine
            .best_move(state, &self.budget)
            .with_context(|| format!("{} failed to search", self.name))?;
        match decision {
            Decision::Move(report) => Ok(report.best_move),
            Decision::GameOver(outcome) => bail!("game is already over: {outcome:?}"),
        }
    }
}

pub struct InteractivePlayer<R, W> {
    name: String,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> InteractivePlayer<R, W> {
    pub fn new(name: impl Into<String>, input: R, output: W) -> Self {
        Self {
            name: name.into(),
            input,
            output,
        }
    }

    fn prompt(&mut self, state: &GameState) -> Result<()> {
        let legal: Vec<String> = state.legal_moves().iter().map(|square| square.to_string()).collect();
        write!(self.output, "\n{}", state.board())?;
        if legal.is_empty() {
            write!(self.output, "{} has no legal move, enter 'pass': ", state.side_to_move())?;
        } else {
            write!(self.output, "{} to move [{}]: ", state.side_to_move(), legal.join(" "))?;
        }
        self.output.flush()?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> Player for InteractivePlayer<R, W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, state: &GameState) -> Result<Move> {
        let mut line = String::new();
        loop {
            self.prompt(state)?;
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                bail!("input closed before {} chose a move", self.name);
            }

            let attempt = line.trim().parse::<Move>().and_then(|mv| state.apply_move(mv).map(|_| mv));
            match attempt {
                Ok(mv) => return Ok(mv),
                Err(err) => {
                    warn!(input = line.trim(), error = %err, "rejected move");
                    writeln!(self.output, "{err}")?;
                }
            }
        }
    }
}

pub fn play_game(state: &mut GameState, black: &mut dyn Player, white: &mut dyn Player) -> Result<Outcome> {
    loop {
        if let Some(outcome) = state.winner() {
            info!(
                ?outcome,
                black = state.board().disc_count(Color::Black),
                white = state.board().disc_count(Color::White),
                "game over"
            );
            return Ok(outcome);
        }

        let side = state.side_to_move();
        let player: &mut dyn Player = match side {
            Color::Black => &mut *black,
            Color::White => &mut *white,
        };

        let mv = player.choose_move(state)?;
        state
            .make_move(mv)
            .with_context(|| format!("{} ({side}) played {mv}", player.name()))?;
        info!(player = player.name(), side = %side, mv = %mv, move_number = state.move_number(), "move played");
    }
}
