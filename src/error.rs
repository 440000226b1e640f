use crate::board::{Color, Square};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("{square} is not a legal move for {side}")]
    InvalidMove { square: Square, side: Color },

    #[error("{side} cannot pass while a legal move exists")]
    IllegalPass { side: Color },

    #[error("the game is over")]
    GameOver,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid snapshot: {0}")]
    Snapshot(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("search budget exhausted before any move was evaluated ({0})")]
    Exhausted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown difficulty '{0}' (expected easy, normal, hard or insane)")]
    UnknownDifficulty(String),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    Closed,

    #[error("unknown frame tag {0:#04x}")]
    UnknownTag(u8),

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("expected a move, received {0}")]
    Unexpected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_move_display() {
        let err = GameError::InvalidMove {
            square: Square::new(2, 3).unwrap(),
            side: Color::Black,
        };
        assert_eq!(err.to_string(), "d3 is not a legal move for Black");
    }

    #[test]
    fn test_illegal_pass_display() {
        let err = GameError::IllegalPass { side: Color::White };
        assert_eq!(err.to_string(), "White cannot pass while a legal move exists");
    }

    #[test]
    fn test_wire_error_display() {
        assert_eq!(WireError::UnknownTag(7).to_string(), "unknown frame tag 0x07");
    }
}
