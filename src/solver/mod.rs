//! The strategy library. Every strategy is reached through [`Solver`], which
//! `Strategy` implements with one exhaustive match.

pub mod belief;
pub mod constraint;
pub mod informed;
pub mod local;
pub mod qlearning;
pub mod uninformed;

use std::collections::VecDeque;

use indicatif::ProgressBar;
use log::debug;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use rustc_hash::FxHashSet;

use crate::board::Board;
use crate::config::SearchConfig;
use crate::node::{NodeId, Provenance, SearchTree, Terminal};
use crate::strategy::Strategy;

pub use belief::{Observation, ObservedCell, Percept};

/// One solve request, already validated.
#[derive(Debug, Clone)]
pub struct Problem {
    pub start: Board,
    pub goal: Board,
    /// Boards the sensorless search must drive to the goal together. Holds
    /// at least `start`.
    pub possible_starts: Vec<Board>,
}

impl Problem {
    pub fn new(start: Board, goal: Board) -> Self {
        Self {
            start,
            goal,
            possible_starts: vec![start],
        }
    }

    pub fn with_possible_starts(mut self, boards: impl IntoIterator<Item = Board>) -> Self {
        for board in boards {
            if !self.possible_starts.contains(&board) {
                self.possible_starts.push(board);
            }
        }
        self
    }
}

/// Caller-owned resources a strategy may draw on.
pub struct SearchContext<'a> {
    pub config: &'a SearchConfig,
    pub rng: &'a mut dyn RngCore,
    pub progress: Option<&'a ProgressBar>,
}

#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub terminal: Option<Terminal>,
    pub trace: Vec<Observation>,
}

impl Outcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn found(terminal: Terminal) -> Self {
        Self {
            terminal: Some(terminal),
            trace: Vec::new(),
        }
    }
}

impl From<Option<Terminal>> for Outcome {
    fn from(terminal: Option<Terminal>) -> Self {
        Self {
            terminal,
            trace: Vec::new(),
        }
    }
}

pub trait Solver {
    fn search(&self, problem: &Problem, ctx: &mut SearchContext<'_>) -> Outcome;
}

impl Solver for Strategy {
    fn search(&self, problem: &Problem, ctx: &mut SearchContext<'_>) -> Outcome {
        let (start, goal) = (&problem.start, &problem.goal);
        let config = ctx.config;

        match self {
            Strategy::Bfs => uninformed::bfs(start, goal).into(),
            Strategy::Dfs => uninformed::dfs(start, goal).into(),
            Strategy::Ucs => uninformed::ucs(start, goal).into(),
            Strategy::Ids => uninformed::ids(start, goal, &config.ids).into(),
            Strategy::Greedy => informed::greedy(start, goal).into(),
            Strategy::AStar => informed::a_star(start, goal).into(),
            Strategy::IdaStar => informed::ida_star(start, goal).into(),
            Strategy::SimpleHillClimbing => {
                local::simple_hill_climbing(start, goal, &config.simple_hill_climbing, ctx.rng).into()
            }
            Strategy::SteepestHillClimbing => {
                local::steepest_hill_climbing(start, goal, &config.steepest_hill_climbing, ctx.rng).into()
            }
            Strategy::StochasticHillClimbing => {
                local::stochastic_hill_climbing(start, goal, &config.stochastic_hill_climbing, ctx.rng).into()
            }
            Strategy::SimulatedAnnealing => local::simulated_annealing(start, goal, &config.annealing, ctx.rng).into(),
            Strategy::LocalBeam => local::local_beam(start, goal, &config.beam).into(),
            Strategy::Genetic => local::genetic(start, goal, &config.genetic, ctx.rng).into(),
            Strategy::Backtracking => constraint::backtracking(start, goal, &config.backtracking).into(),
            Strategy::Ac3 => constraint::ac3(start, goal, &config.ac3).into(),
            Strategy::GenerateAndTest => {
                constraint::generate_and_test(start, goal, &config.generate_and_test, ctx.rng).into()
            }
            Strategy::AndOrGraph => belief::and_or_search(start, goal, &config.and_or).into(),
            Strategy::NoObservation => belief::no_observation(problem, &config.no_observation),
            Strategy::PartialObservation => belief::partial_observation(start, goal, &config.partial_observation),
            Strategy::QLearning => qlearning::solve(start, goal, &config.q_learning, ctx.rng, ctx.progress).into(),
        }
    }
}

/// Breadth-first search continuing inside `tree` from `from`, so the result
/// stays chained to whatever led to `from`.
pub(crate) fn bfs_within(tree: &mut SearchTree, from: NodeId) -> Option<NodeId> {
    let goal = *tree.goal();
    bfs_within_to(tree, from, &goal)
}

/// Like [`bfs_within`] but stops at an arbitrary `target` board.
pub(crate) fn bfs_within_to(tree: &mut SearchTree, from: NodeId, target: &Board) -> Option<NodeId> {
    let mut queue = VecDeque::from([from]);
    let mut visited = FxHashSet::default();

    while let Some(current) = queue.pop_front() {
        if tree.board(current) == target {
            return Some(current);
        }
        if !visited.insert(*tree.board(current)) {
            continue;
        }
        for child in tree.expand(current) {
            if !visited.contains(tree.board(child)) {
                queue.push_back(child);
            }
        }
    }

    None
}

/// The fallback used by incomplete strategies: a fresh breadth-first search
/// from the original start, flagged as reconstructed.
pub(crate) fn bfs_fallback(start: &Board, goal: &Board, strategy: Strategy) -> Option<Terminal> {
    debug!("{}: falling back to BFS from the original start", strategy);
    let mut tree = SearchTree::new(*goal, strategy);
    let root = tree.root(*start);
    bfs_within(&mut tree, root).map(|id| tree.into_terminal(id, Provenance::Reconstructed))
}

/// Random walk of `1..=max_moves` slides from `from`, recorded in the tree.
pub(crate) fn random_walk(tree: &mut SearchTree, from: NodeId, max_moves: u32, rng: &mut dyn RngCore) -> NodeId {
    let steps = rng.gen_range(1..=max_moves.max(1));
    walk(tree, from, steps, rng)
}

pub(crate) fn walk(tree: &mut SearchTree, from: NodeId, steps: u32, rng: &mut dyn RngCore) -> NodeId {
    let mut current = from;
    for _ in 0..steps {
        let moves = tree.board(current).possible_moves();
        if let Some(&next) = moves.choose(rng) {
            current = tree.child(current, next);
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn walks_stay_chained_to_their_origin() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut tree = SearchTree::new(Board::solved(), Strategy::SimpleHillClimbing);
        let root = tree.root(Board::solved());
        let end = random_walk(&mut tree, root, 10, &mut rng);

        let chain = tree.chain(end);
        assert_eq!(chain[0], root);
        assert!((2..=11).contains(&chain.len()));
        for pair in chain.windows(2) {
            assert!(tree.board(pair[0]).is_adjacent(tree.board(pair[1])));
        }
    }

    #[test]
    fn bfs_within_extends_an_existing_chain() {
        let goal = Board::solved();
        let mut tree = SearchTree::new(goal, Strategy::LocalBeam);
        let root = tree.root("123456078".parse().unwrap());
        let detour = tree.child(root, "123056478".parse().unwrap());
        let found = bfs_within(&mut tree, detour).unwrap();

        assert_eq!(tree.chain(found)[0], root);
        assert_eq!(tree.moves(found), 4);
    }

    #[test]
    fn fallback_is_flagged_reconstructed() {
        let terminal = bfs_fallback(&"123456708".parse().unwrap(), &Board::solved(), Strategy::Genetic).unwrap();
        assert_eq!(terminal.provenance(), Provenance::Reconstructed);
        assert_eq!(terminal.moves(), 1);
    }
}
