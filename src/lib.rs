pub mod board;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod movegen;
pub mod player;
pub mod protocol;
pub mod search;
pub mod state;
pub mod transposition;
pub mod wire;
pub mod zobrist;

pub use board::{Board, Cell, Color, Square, SquareSet};
pub use config::{Difficulty, SearchBudget};
pub use error::{ConfigError, GameError, SearchError, WireError};
pub use movegen::Move;
pub use search::{Decision, SearchEngine, SearchReport};
pub use state::{GameState, Outcome};
