use thiserror::Error;

use crate::board::Direction;

#[derive(Error, Debug)]
pub enum PuzzleError {
    #[error("board must be 3x3, got {rows} rows with row lengths {lengths:?}")]
    WrongShape { rows: usize, lengths: Vec<usize> },

    #[error("tile value {value} is out of range (must be 0-8)")]
    ValueOutOfRange { value: u8 },

    #[error("tile value {value} appears more than once")]
    DuplicateValue { value: u8 },

    #[error("board has no blank tile (0)")]
    MissingBlank,

    #[error("cannot parse board from '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("Illegal move: cannot move blank {direction:?} from {position:?}")]
    IllegalMove {
        direction: Direction,
        position: (usize, usize),
    },

    #[error("unknown strategy '{tag}'")]
    UnknownStrategy { tag: String },

    #[error("could not scramble a board distinct from the goal after {attempts} attempts")]
    ScrambleExhausted { attempts: u32 },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PuzzleError>;
