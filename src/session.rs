//! Entry point for solving: a `Session` owns the configuration and random
//! source every solve draws on, so runs are isolated and reproducible.

use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

use crate::board::Board;
use crate::config::{ScrambleConfig, SearchConfig};
use crate::error::{PuzzleError, Result};
use crate::node::{solution_path, PathStep, Provenance, SearchTree, Terminal};
use crate::solvability::is_solvable;
use crate::solver::{Observation, Problem, SearchContext, Solver};
use crate::strategy::Strategy;

/// Result of one solve. `terminal` is `None` when the pair is unsolvable,
/// the strategy gave up, or the tag was unknown; `elapsed` is always set.
#[derive(Debug, Clone)]
pub struct Solution {
    pub start: Board,
    pub strategy: Option<Strategy>,
    pub terminal: Option<Terminal>,
    pub elapsed: Duration,
    /// Per-step observations; only belief-state strategies fill this.
    pub trace: Vec<Observation>,
}

impl Solution {
    fn unsolved(start: Board, strategy: Option<Strategy>, elapsed: Duration) -> Self {
        Self {
            start,
            strategy,
            terminal: None,
            elapsed,
            trace: Vec::new(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn is_solved(&self) -> bool {
        self.terminal.as_ref().is_some_and(Terminal::is_goal)
    }

    pub fn moves(&self) -> Option<u32> {
        self.terminal.as_ref().map(Terminal::moves)
    }

    pub fn provenance(&self) -> Option<Provenance> {
        self.terminal.as_ref().map(Terminal::provenance)
    }

    pub fn path(&self) -> Vec<PathStep> {
        solution_path(self.terminal.as_ref())
    }
}

pub struct Session<R: RngCore = StdRng> {
    config: SearchConfig,
    rng: R,
    progress: Option<ProgressBar>,
}

impl Session<StdRng> {
    pub fn new(config: SearchConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn seeded(config: SearchConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl Default for Session<StdRng> {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl<R: RngCore> Session<R> {
    pub fn with_rng(config: SearchConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            progress: None,
        }
    }

    /// Training-heavy strategies report progress here.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn solve(&mut self, start: &Board, goal: &Board, strategy: Strategy) -> Solution {
        self.run(Problem::new(*start, *goal), strategy)
    }

    /// Solves by string tag. An unknown tag is not an error: it yields no solution.
    pub fn solve_tagged(&mut self, start: &Board, goal: &Board, tag: &str) -> Solution {
        let timer = Instant::now();
        match tag.parse::<Strategy>() {
            Ok(strategy) => self.solve(start, goal, strategy),
            Err(err) => {
                warn!("{}", err);
                Solution::unsolved(*start, None, timer.elapsed())
            }
        }
    }

    /// Validates raw grids before anything reaches the strategies.
    pub fn solve_grids(&mut self, start: Vec<Vec<u8>>, goal: Vec<Vec<u8>>, strategy: Strategy) -> Result<Solution> {
        let start = Board::try_from(start)?;
        let goal = Board::try_from(goal)?;
        Ok(self.solve(&start, &goal, strategy))
    }

    /// Sensorless solve where the true start is one of several possible
    /// boards. Possible starts that can never reach the goal are dropped.
    pub fn solve_conformant(&mut self, start: &Board, possible_starts: &[Board], goal: &Board) -> Solution {
        let reachable: Vec<Board> = possible_starts
            .iter()
            .filter(|candidate| {
                let ok = is_solvable(candidate, goal);
                if !ok {
                    warn!("dropping possible start {:?}: goal unreachable", candidate.cells());
                }
                ok
            })
            .copied()
            .collect();
        let problem = Problem::new(*start, *goal).with_possible_starts(reachable);
        self.run(problem, Strategy::NoObservation)
    }

    fn run(&mut self, problem: Problem, strategy: Strategy) -> Solution {
        let timer = Instant::now();

        if !is_solvable(&problem.start, &problem.goal) {
            info!("{}: start and goal differ in inversion parity, puzzle is unsolvable", strategy);
            return Solution::unsolved(problem.start, Some(strategy), timer.elapsed());
        }

        if problem.start == problem.goal && problem.possible_starts == [problem.start] {
            let mut tree = SearchTree::new(problem.goal, strategy);
            let root = tree.root(problem.start);
            return Solution {
                start: problem.start,
                strategy: Some(strategy),
                terminal: Some(tree.into_terminal(root, Provenance::Exact)),
                elapsed: timer.elapsed(),
                trace: Vec::new(),
            };
        }

        let mut ctx = SearchContext {
            config: &self.config,
            rng: &mut self.rng,
            progress: self.progress.as_ref(),
        };
        let outcome = strategy.search(&problem, &mut ctx);
        let elapsed = timer.elapsed();
        debug!("{} finished in {:.3}s", strategy, elapsed.as_secs_f64());

        Solution {
            start: problem.start,
            strategy: Some(strategy),
            terminal: outcome.terminal,
            elapsed,
            trace: outcome.trace,
        }
    }

    /// Draws `count` distinct scrambled starts and solves each one on its own
    /// with `strategy`. Solutions come back in draw order.
    pub fn solve_beliefs(&mut self, goal: &Board, count: usize, strategy: Strategy) -> Result<Vec<Solution>> {
        let starts = self.belief_starts(goal, count)?;
        Ok(starts.iter().map(|start| self.solve(start, goal, strategy)).collect())
    }

    pub fn scramble(&mut self, goal: &Board) -> Result<Board> {
        scramble(goal, &mut self.rng, &self.config.scramble)
    }

    pub fn belief_starts(&mut self, goal: &Board, count: usize) -> Result<Vec<Board>> {
        belief_starts(goal, count, &mut self.rng, &self.config.scramble)
    }
}

/// A board reached from `goal` by random slides, never `goal` itself. Always
/// solvable with respect to `goal`.
pub fn scramble(goal: &Board, rng: &mut dyn RngCore, config: &ScrambleConfig) -> Result<Board> {
    for _ in 0..config.max_attempts {
        let mut board = *goal;
        for _ in 0..config.moves {
            if let Some(&next) = board.possible_moves().choose(rng) {
                board = next;
            }
        }
        if board != *goal {
            return Ok(board);
        }
    }
    Err(PuzzleError::ScrambleExhausted {
        attempts: config.max_attempts,
    })
}

/// `count` distinct scrambled boards, used as the possible starts of a
/// sensorless search.
pub fn belief_starts(goal: &Board, count: usize, rng: &mut dyn RngCore, config: &ScrambleConfig) -> Result<Vec<Board>> {
    let mut boards: Vec<Board> = Vec::with_capacity(count);
    let mut attempts = 0;
    while boards.len() < count {
        if attempts >= config.max_attempts {
            return Err(PuzzleError::ScrambleExhausted { attempts });
        }
        let board = scramble(goal, rng, config)?;
        if boards.contains(&board) {
            attempts += 1;
        } else {
            boards.push(board);
        }
    }
    Ok(boards)
}
