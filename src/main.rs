use std::io;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mtd_othello::config::{Difficulty, SearchBudget};
use mtd_othello::player::{play_game, InteractivePlayer, Player, SearchPlayer};
use mtd_othello::protocol::ProtocolHandler;
use mtd_othello::search::SearchEngine;
use mtd_othello::state::{GameState, Outcome};

#[derive(Parser)]
#[command(name = "mtd-othello", version, about = "Othello engine with MTD(f) search")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Answer text protocol commands on stdin/stdout
    Protocol(SearchArgs),
    /// Play a game in the terminal
    Play {
        /// Which side the human plays; `none` lets the engine play itself
        #[arg(long, value_enum, default_value_t = Seat::Black)]
        human: Seat,

        /// Keep transposition entries between engine moves
        #[arg(long)]
        retain_table: bool,

        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(Args, Clone)]
struct SearchArgs {
    /// Preset search limits: easy, normal, hard or insane
    #[arg(long, default_value = "normal")]
    difficulty: Difficulty,

    /// Override the preset's maximum depth
    #[arg(long)]
    depth: Option<u32>,

    /// Override the preset's time limit in milliseconds
    #[arg(long)]
    time_ms: Option<u64>,

    /// Transposition table capacity in entries
    #[arg(long)]
    table_capacity: Option<usize>,
}

impl SearchArgs {
    fn budget(&self) -> Result<SearchBudget> {
        let mut budget = self.difficulty.budget();
        if let Some(depth) = self.depth {
            budget = budget.with_max_depth(depth);
        }
        if let Some(millis) = self.time_ms {
            budget = budget.with_time_limit_ms(millis);
        }
        if let Some(capacity) = self.table_capacity {
            budget = budget.with_table_capacity(capacity);
        }
        budget.validate().context("invalid search options")?;
        Ok(budget)
    }
}

impl Default for SearchArgs {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            depth: None,
            time_ms: None,
            table_capacity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Seat {
    Black,
    White,
    None,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Protocol(SearchArgs::default())) {
        Command::Protocol(search) => {
            let budget = search.budget()?;
            info!(?budget, "starting protocol loop");
            ProtocolHandler::new(budget).run()
        }
        Command::Play {
            human,
            retain_table,
            search,
        } => play(human, retain_table, search.budget()?),
    }
}

fn play(human: Seat, retain_table: bool, budget: SearchBudget) -> Result<()> {
    let engine = |name: &str| SearchPlayer::with_engine(name, SearchEngine::new().retain_table(retain_table), budget);
    let stdin = io::stdin();
    let person = || InteractivePlayer::new("you", stdin.lock(), io::stdout());

    let (mut black, mut white): (Box<dyn Player>, Box<dyn Player>) = match human {
        Seat::Black => (Box::new(person()), Box::new(engine("engine"))),
        Seat::White => (Box::new(engine("engine")), Box::new(person())),
        Seat::None => (Box::new(engine("black engine")), Box::new(engine("white engine"))),
    };

    let mut state = GameState::new();
    let outcome = play_game(&mut state, black.as_mut(), white.as_mut())?;
    print!("\n{}", state.board());
    match outcome {
        Outcome::Winner(color) => println!("{color} wins"),
        Outcome::Draw => println!("Draw"),
    }
    Ok(())
}
