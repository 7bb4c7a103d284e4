//! The puzzle recast as constraint problems: one variable per move, whose
//! value is the board after that move.

use std::collections::VecDeque;

use log::{debug, trace, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::RngCore;
use rustc_hash::FxHashSet;

use crate::board::Board;
use crate::config::{Ac3Config, BacktrackingConfig, GenerateTestConfig};
use crate::node::{NodeId, Provenance, SearchTree, Terminal};
use crate::solver::{bfs_fallback, bfs_within, random_walk};
use crate::strategy::Strategy;
use crate::traits::puzzle::Heuristic;

struct Backtracker<'a> {
    tree: SearchTree,
    config: &'a BacktrackingConfig,
    on_path: FxHashSet<Board>,
    expansions: u64,
}

impl Backtracker<'_> {
    fn descend(&mut self, current: NodeId) -> Option<NodeId> {
        if self.tree.is_goal(current) {
            return Some(current);
        }
        if self.tree.moves(current) >= self.config.max_depth || self.expansions >= self.config.max_expansions {
            return None;
        }
        self.expansions += 1;

        let board = *self.tree.board(current);
        self.on_path.insert(board);

        let mut children: Vec<NodeId> = self
            .tree
            .expand(current)
            .into_iter()
            .filter(|&child| {
                let next = self.tree.board(child);
                board.is_adjacent(next) && !self.on_path.contains(next)
            })
            .collect();
        // stable: equal heuristics keep slide order
        children.sort_by_key(|&child| self.tree.h(child));

        for child in children {
            if let Some(found) = self.descend(child) {
                return Some(found);
            }
        }

        self.on_path.remove(&board);
        None
    }
}

/// Depth-bounded backtracking. A board is never revisited along the current
/// branch; other branches may pass through it again.
pub fn backtracking(start: &Board, goal: &Board, config: &BacktrackingConfig) -> Option<Terminal> {
    let mut tree = SearchTree::new(*goal, Strategy::Backtracking);
    let root = tree.root(*start);
    let mut search = Backtracker {
        tree,
        config,
        on_path: FxHashSet::default(),
        expansions: 0,
    };

    match search.descend(root) {
        Some(found) => {
            debug!(
                "Backtracking found solution in {} moves after {} expansions",
                search.tree.moves(found),
                search.expansions
            );
            Some(search.tree.into_terminal(found, Provenance::Exact))
        }
        None => {
            debug!("Backtracking failed after {} expansions", search.expansions);
            None
        }
    }
}

/// Breadth-first layers from `start`: layer `i` holds boards first reached
/// after `i` slides. Stops once the goal shows up.
fn build_layers(start: &Board, goal: &Board, config: &Ac3Config) -> Option<Vec<Vec<Board>>> {
    let mut layers = vec![vec![*start]];
    let mut seen = FxHashSet::from_iter([*start]);

    while layers.len() < config.max_depth {
        let last = layers.last()?;
        if last.contains(goal) {
            break;
        }

        let mut next: Vec<Board> = Vec::new();
        for board in last {
            for successor in board.possible_moves() {
                if seen.insert(successor) {
                    next.push(successor);
                }
            }
        }
        if next.is_empty() {
            return None;
        }

        // keep the goal even when the layer gets cut down
        next.sort_by_key(|b| b.heuristic(goal));
        next.truncate(config.max_states_per_layer);
        layers.push(next);
    }

    layers.last().filter(|last| last.contains(goal))?;
    Some(layers)
}

/// Drops values of `domains[x]` that have no neighbour in `domains[y]`.
/// Returns whether anything was removed.
fn revise(domains: &mut [Vec<Board>], x: usize, y: usize) -> bool {
    let support: FxHashSet<Board> = domains[y].iter().copied().collect();
    let before = domains[x].len();
    domains[x].retain(|value| value.possible_moves().iter().any(|next| support.contains(next)));
    domains[x].len() != before
}

/// Arc consistency over the chain of layer variables. `false` if a domain
/// was wiped out.
fn enforce_arc_consistency(domains: &mut [Vec<Board>]) -> bool {
    let last = domains.len() - 1;
    let mut arcs: VecDeque<(usize, usize)> = (0..last).flat_map(|i| [(i, i + 1), (i + 1, i)]).collect();

    while let Some((x, y)) = arcs.pop_front() {
        if revise(domains, x, y) {
            if domains[x].is_empty() {
                return false;
            }
            if x > 0 && x - 1 != y {
                arcs.push_back((x - 1, x));
            }
            if x < last && x + 1 != y {
                arcs.push_back((x + 1, x));
            }
        }
    }
    true
}

/// Layered constraint solve: prune with AC-3, then assign one board per layer.
/// Any failure along the way falls back to breadth-first search.
pub fn ac3(start: &Board, goal: &Board, config: &Ac3Config) -> Option<Terminal> {
    let Some(mut domains) = build_layers(start, goal, config) else {
        debug!("AC3: goal not reached within {} layers", config.max_depth);
        return bfs_fallback(start, goal, Strategy::Ac3);
    };

    let depth = domains.len() - 1;
    domains[depth] = vec![*goal];
    trace!(
        "AC3: {} layers, domain sizes {:?}",
        domains.len(),
        domains.iter().map(Vec::len).collect::<Vec<_>>()
    );

    if !enforce_arc_consistency(&mut domains) {
        warn!("AC3: propagation emptied a domain");
        return bfs_fallback(start, goal, Strategy::Ac3);
    }

    let mut tree = SearchTree::new(*goal, Strategy::Ac3);
    let mut current = tree.root(*start);
    for domain in &domains[1..] {
        let here = *tree.board(current);
        let Some(&next) = domain.iter().find(|value| here.is_adjacent(value)) else {
            warn!("AC3: no consistent value after {} moves", tree.moves(current));
            return bfs_fallback(start, goal, Strategy::Ac3);
        };
        current = tree.child(current, next);
    }

    if !tree.is_goal(current) {
        warn!("AC3: assignment did not end on the goal");
        return bfs_fallback(start, goal, Strategy::Ac3);
    }
    debug!("AC3 found solution in {} moves", depth);
    Some(tree.into_terminal(current, Provenance::Exact))
}

/// Random walks biased toward low heuristics, restarting from perturbed
/// starts. When every restart is spent, searches breadth-first from the best
/// state seen and then from the start.
pub fn generate_and_test(
    start: &Board,
    goal: &Board,
    config: &GenerateTestConfig,
    rng: &mut dyn RngCore,
) -> Option<Terminal> {
    let mut tree = SearchTree::new(*goal, Strategy::GenerateAndTest);
    let root = tree.root(*start);
    let mut best = root;

    for restart in 0..config.max_restarts {
        let mut current = if restart == 0 {
            root
        } else {
            random_walk(&mut tree, root, config.perturb_moves, rng)
        };

        for _ in 0..config.max_steps {
            if tree.is_goal(current) {
                debug!("Generate and Test found solution in {} moves", tree.moves(current));
                return Some(tree.into_terminal(current, Provenance::Exact));
            }
            if tree.h(current) < tree.h(best) {
                best = current;
            }

            let candidates = tree.board(current).possible_moves();
            let weights = candidates.iter().map(|b| 1.0 / (b.heuristic(goal) as f64 + 1.0));
            let Ok(dist) = WeightedIndex::new(weights) else {
                break;
            };
            current = tree.child(current, candidates[dist.sample(rng)]);
        }
        trace!("Generate and Test: restart {}, best h={}", restart + 1, tree.h(best));
    }

    debug!("Generate and Test: searching from best state (h={})", tree.h(best));
    match bfs_within(&mut tree, best) {
        Some(found) => Some(tree.into_terminal(found, Provenance::Reconstructed)),
        None => bfs_fallback(start, goal, Strategy::GenerateAndTest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    fn assert_legal_chain(terminal: &Terminal, start: &Board) {
        let boards = terminal.boards();
        assert_eq!(boards[0], *start);
        for pair in boards.windows(2) {
            assert!(pair[0].is_adjacent(&pair[1]));
        }
    }

    #[test]
    fn backtracking_solves_within_depth() {
        let start = board("413726058");
        let found = backtracking(&start, &Board::solved(), &BacktrackingConfig::default()).unwrap();
        assert!(found.is_goal());
        assert!(found.moves() <= 50);
        assert_legal_chain(&found, &start);
    }

    #[test]
    fn backtracking_stops_at_expansion_budget() {
        let config = BacktrackingConfig {
            max_depth: 50,
            max_expansions: 1,
        };
        assert!(backtracking(&board("413726058"), &Board::solved(), &config).is_none());
    }

    #[test]
    fn backtracking_respects_depth_bound() {
        let config = BacktrackingConfig {
            max_depth: 5,
            ..BacktrackingConfig::default()
        };
        assert!(backtracking(&board("413726058"), &Board::solved(), &config).is_none());
    }

    #[test]
    fn ac3_assigns_one_board_per_layer() {
        let start = board("413726058");
        let found = ac3(&start, &Board::solved(), &Ac3Config::default()).unwrap();
        assert_eq!(found.provenance(), Provenance::Exact);
        assert_eq!(found.moves(), 6);
        assert_legal_chain(&found, &start);
    }

    #[test]
    fn ac3_falls_back_when_layers_run_out() {
        let config = Ac3Config {
            max_depth: 3,
            ..Ac3Config::default()
        };
        let found = ac3(&board("413726058"), &Board::solved(), &config).unwrap();
        assert_eq!(found.provenance(), Provenance::Reconstructed);
        assert_eq!(found.moves(), 6);
    }

    #[test]
    fn arc_consistency_prunes_dead_ends() {
        let start = board("123405786");
        let goal = Board::solved();
        let mut domains = vec![vec![start], start.possible_moves(), vec![goal]];
        assert!(enforce_arc_consistency(&mut domains));
        assert_eq!(domains[1], vec![board("123450786")]);
    }

    #[test]
    fn generate_and_test_always_reaches_goal() {
        let start = board("724506831");
        let config = GenerateTestConfig {
            max_steps: 20,
            max_restarts: 2,
            perturb_moves: 3,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let found = generate_and_test(&start, &Board::solved(), &config, &mut rng).unwrap();
        assert!(found.is_goal());
        assert_legal_chain(&found, &start);
    }
}
