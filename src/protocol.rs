use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use crate::config::SearchBudget;
use crate::movegen::Move;
use crate::search::{Decision, SearchEngine};
use crate::state::{GameState, Outcome};

pub struct ProtocolHandler {
    state: GameState,
    engine: SearchEngine,
    budget: SearchBudget,
}

impl ProtocolHandler {
    pub fn new(budget: SearchBudget) -> Self {
        Self::with_engine(SearchEngine::new(), budget)
    }

    pub fn with_engine(engine: SearchEngine, budget: SearchBudget) -> Self {
        Self {
            state: GameState::new(),
            engine,
            budget,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve(stdin.lock(), stdout.lock())
    }

    pub fn serve<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> Result<()> {
        let mut line = String::new();
        while input.read_line(&mut line).context("reading command")? > 0 {
            let command = line.trim();
            if command == "quit" {
                break;
            }

            match self.handle_command(command) {
                Ok(response) => write!(output, "{response}")?,
                Err(err) => {
                    warn!(command, error = %err, "command failed");
                    writeln!(output, "error {err:#}")?;
                }
            }
            output.flush()?;
            line.clear();
        }
        Ok(())
    }

    pub fn handle_command(&mut self, command: &str) -> Result<String> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let Some((&name, args)) = parts.split_first() else {
            return Ok(String::new());
        };

        match name {
            "hello" => Ok(self.handle_hello()),
            "isready" => Ok("readyok\n".to_string()),
            "newgame" => {
                self.state = GameState::new();
                Ok(String::new())
            }
            "position" => self.handle_position(command, args),
            "move" => self.handle_move(args),
            "go" => self.handle_go(args),
            "legal" => Ok(self.handle_legal()),
            "show" => Ok(format!("{}{} to move\n", self.state.board(), self.state.side_to_move())),
            "snapshot" => Ok(format!("{}\n", serde_json::to_string(&self.state)?)),
            "quit" => Ok(String::new()),
            other => bail!("unknown command '{other}'"),
        }
    }

    fn handle_hello(&self) -> String {
        format!("id name {}\nid version {}\nok\n", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    fn handle_position(&mut self, command: &str, args: &[&str]) -> Result<String> {
        match args.first() {
            Some(&"startpos") => {
                let moves = match args.get(1) {
                    Some(&"moves") => parse_moves(&args[2..])?,
                    Some(other) => bail!("expected 'moves', found '{other}'"),
                    None => Vec::new(),
                };
                self.state = GameState::from_moves(&moves)?;
            }
            Some(&"snapshot") => {
                // The JSON may contain spaces, so take everything after the keyword
                let json = command
                    .split_once("snapshot")
                    .map(|(_, rest)| rest.trim())
                    .ok_or_else(|| anyhow!("missing snapshot"))?;
                self.state = serde_json::from_str(json).context("invalid snapshot")?;
            }
            Some(other) => bail!("unknown position kind '{other}'"),
            None => bail!("position requires 'startpos' or 'snapshot'"),
        }
        Ok(String::new())
    }

    fn handle_move(&mut self, args: &[&str]) -> Result<String> {
        let text = args.first().ok_or_else(|| anyhow!("move requires an argument"))?;
        let mv: Move = text.parse()?;
        self.state.make_move(mv)?;
        Ok(String::new())
    }

    fn handle_go(&mut self, args: &[&str]) -> Result<String> {
        let mut budget = self.budget;
        let mut iter = args.iter();
        while let Some(&key) = iter.next() {
            let value = iter.next().ok_or_else(|| anyhow!("'{key}' needs a value"))?;
            match key {
                "depth" => budget.max_depth = Some(value.parse().context("bad depth")?),
                "movetime" => budget.time_limit_ms = Some(value.parse().context("bad movetime")?),
                "nodes" => budget.node_limit = Some(value.parse().context("bad node count")?),
                other => bail!("unknown go parameter '{other}'"),
            }
        }
        budget.validate()?;

        match self.engine.best_move(&self.state, &budget)? {
            Decision::Move(report) => {
                info!(best_move = %report.best_move, score = report.score, depth = report.depth, "go");
                Ok(format!(
                    "bestmove {} score {} depth {} nodes {}\n",
                    report.best_move, report.score, report.depth, report.nodes
                ))
            }
            Decision::GameOver(outcome) => Ok(format!("gameover {}\n", describe(outcome))),
        }
    }

    fn handle_legal(&self) -> String {
        let moves: Vec<String> = if self.state.must_pass() {
            vec![Move::Pass.to_string()]
        } else {
            self.state.legal_moves().iter().map(|square| square.to_string()).collect()
        };
        format!("legal {}\n", moves.join(" "))
    }
}

fn parse_moves(texts: &[&str]) -> Result<Vec<Move>> {
    texts
        .iter()
        .map(|text| text.parse::<Move>().with_context(|| format!("bad move '{text}'")))
        .collect()
}

fn describe(outcome: Outcome) -> String {
    match outcome {
        Outcome::Winner(color) => color.name().to_lowercase(),
        Outcome::Draw => "draw".to_string(),
    }
}
