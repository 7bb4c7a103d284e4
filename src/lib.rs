pub mod bench;
pub mod board;
pub mod config;
pub mod error;
pub mod node;
pub mod session;
pub mod solvability;
pub mod solver;
pub mod strategy;
pub mod traits;
pub mod util;

mod test;

pub use board::{Board, Direction};
pub use config::SearchConfig;
pub use error::{PuzzleError, Result};
pub use node::{solution_path, PathStep, Provenance, Terminal};
pub use session::{Session, Solution};
pub use solvability::is_solvable;
pub use strategy::Strategy;
