//! Local search and metaheuristics. None of these is complete: they either
//! fall back to breadth-first search or return a best-effort node, and the
//! returned `Provenance` says which happened.

use log::{debug, trace};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use rustc_hash::FxHashSet;

use crate::board::{Board, CELLS};
use crate::config::{AnnealingConfig, BeamConfig, GeneticConfig, HillClimbingConfig, StochasticConfig};
use crate::node::{NodeId, Provenance, SearchTree, Terminal};
use crate::solvability::is_solvable;
use crate::solver::{bfs_fallback, bfs_within, bfs_within_to, random_walk, walk};
use crate::strategy::Strategy;
use crate::traits::puzzle::Heuristic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClimbRule {
    /// Take the first neighbour, in slide order, that is no worse.
    FirstNoWorse,
    /// Take the best neighbour, and only if it is strictly better.
    SteepestAscent,
}

pub fn simple_hill_climbing(
    start: &Board,
    goal: &Board,
    config: &HillClimbingConfig,
    rng: &mut dyn RngCore,
) -> Option<Terminal> {
    hill_climb(start, goal, config, rng, Strategy::SimpleHillClimbing, ClimbRule::FirstNoWorse)
}

pub fn steepest_hill_climbing(
    start: &Board,
    goal: &Board,
    config: &HillClimbingConfig,
    rng: &mut dyn RngCore,
) -> Option<Terminal> {
    hill_climb(start, goal, config, rng, Strategy::SteepestHillClimbing, ClimbRule::SteepestAscent)
}

fn hill_climb(
    start: &Board,
    goal: &Board,
    config: &HillClimbingConfig,
    rng: &mut dyn RngCore,
    strategy: Strategy,
    rule: ClimbRule,
) -> Option<Terminal> {
    let mut tree = SearchTree::new(*goal, strategy);
    let root = tree.root(*start);
    // boards climbed through on any restart are not stepped on again
    let mut global_visited: FxHashSet<Board> = FxHashSet::default();
    let mut best_h = tree.h(root);

    for restart in 0..config.max_restarts {
        let mut current = if restart == 0 {
            root
        } else {
            random_walk(&mut tree, root, config.perturb_moves, rng)
        };
        let mut visited: FxHashSet<Board> = FxHashSet::default();
        let mut steps = 0;

        while !tree.is_goal(current) && steps < config.max_steps {
            let board = *tree.board(current);
            if !visited.insert(board) {
                trace!("{}: cycle at {:?}", strategy, board.cells());
                break;
            }
            global_visited.insert(board);

            let current_h = tree.h(current);
            let candidates = board
                .possible_moves()
                .into_iter()
                .filter(|next| !global_visited.contains(next))
                .map(|next| (next.heuristic(goal), next));

            let chosen = match rule {
                ClimbRule::FirstNoWorse => candidates.into_iter().find(|&(h, _)| h <= current_h),
                ClimbRule::SteepestAscent => candidates
                    .min_by_key(|&(h, _)| h)
                    .filter(|&(h, _)| h < current_h),
            };

            match chosen {
                Some((h, next)) => {
                    current = tree.child(current, next);
                    best_h = best_h.min(h);
                }
                None => break,
            }
            steps += 1;
        }

        if tree.is_goal(current) {
            debug!("{}: solution found in {} moves on restart {}", strategy, tree.moves(current), restart + 1);
            return Some(tree.into_terminal(current, Provenance::Exact));
        }
        trace!("{}: restart {} stuck at h={}", strategy, restart + 1, tree.h(current));
    }

    debug!("{}: stuck after {} restarts, best heuristic {}", strategy, config.max_restarts, best_h);
    bfs_fallback(start, goal, strategy)
}

/// Picks among all successors with weights favouring lower heuristics. Has
/// no fallback: returns `None` once every restart is spent.
pub fn stochastic_hill_climbing(
    start: &Board,
    goal: &Board,
    config: &StochasticConfig,
    rng: &mut dyn RngCore,
) -> Option<Terminal> {
    let mut tree = SearchTree::new(*goal, Strategy::StochasticHillClimbing);
    let root = tree.root(*start);

    for restart in 0..config.max_restarts {
        let mut current = if restart == 0 {
            root
        } else {
            random_walk(&mut tree, root, config.perturb_moves, rng)
        };

        for _ in 0..config.max_steps {
            if tree.is_goal(current) {
                debug!("Stochastic Hill Climbing: solution found in {} moves", tree.moves(current));
                return Some(tree.into_terminal(current, Provenance::Exact));
            }

            let successors = tree.board(current).possible_moves();
            let heuristics: Vec<u32> = successors.iter().map(|b| b.heuristic(goal)).collect();
            let max_h = heuristics.iter().copied().max().unwrap_or(0);
            let weights = heuristics.iter().map(|&h| max_h - h + 1);

            let next = match WeightedIndex::new(weights) {
                Ok(dist) => successors[dist.sample(rng)],
                Err(_) => match successors.choose(rng) {
                    Some(&board) => board,
                    None => break,
                },
            };
            current = tree.child(current, next);
        }
        trace!("Stochastic Hill Climbing: restart {}", restart + 1);
    }

    debug!("Stochastic Hill Climbing: failed to find solution");
    None
}

/// Geometric cooling that jumps back to `reheat_temperature` once it falls
/// below `min_temperature`.
struct CoolingSchedule<'a> {
    config: &'a AnnealingConfig,
    temperature: f64,
}

impl<'a> CoolingSchedule<'a> {
    fn new(config: &'a AnnealingConfig) -> Self {
        Self {
            config,
            temperature: config.initial_temperature,
        }
    }

    /// Metropolis probability of taking a move that changes `h` by `delta_e`.
    fn acceptance(&self, delta_e: f64) -> f64 {
        (-delta_e / self.temperature.max(1e-6)).exp()
    }

    /// Returns true when this step reheated.
    fn cool(&mut self) -> bool {
        self.temperature *= self.config.cooling_rate;
        if self.temperature < self.config.min_temperature {
            self.temperature = self.config.reheat_temperature;
            return true;
        }
        false
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct AnnealingStats {
    restarts: u32,
    reheats: u32,
}

/// Metropolis acceptance with a geometric cooling schedule. Stagnation sends
/// the walk back to the start or to the best node; a cold schedule reheats.
pub fn simulated_annealing(
    start: &Board,
    goal: &Board,
    config: &AnnealingConfig,
    rng: &mut dyn RngCore,
) -> Option<Terminal> {
    Some(anneal(start, goal, config, rng).0)
}

fn anneal(start: &Board, goal: &Board, config: &AnnealingConfig, rng: &mut dyn RngCore) -> (Terminal, AnnealingStats) {
    let mut tree = SearchTree::new(*goal, Strategy::SimulatedAnnealing);
    let root = tree.root(*start);
    let mut current = root;
    let mut best = root;
    let mut schedule = CoolingSchedule::new(config);
    let mut stats = AnnealingStats::default();
    let mut stagnant_steps = 0;

    for iteration in 0..config.max_iterations {
        if tree.is_goal(current) {
            debug!("Simulated Annealing found solution in {} moves", tree.moves(current));
            return (tree.into_terminal(current, Provenance::Exact), stats);
        }

        let Some(&next) = tree.board(current).possible_moves().choose(rng) else {
            break;
        };
        let delta_e = next.heuristic(goal) as f64 - tree.h(current) as f64;

        if delta_e < 0.0 || rng.gen::<f64>() < schedule.acceptance(delta_e) {
            current = tree.child(current, next);
            if tree.h(current) < tree.h(best) {
                best = current;
                stagnant_steps = 0;
            } else {
                stagnant_steps += 1;
            }
        } else {
            stagnant_steps += 1;
        }

        if stagnant_steps >= config.max_stagnant {
            current = if rng.gen_bool(0.5) { root } else { best };
            stagnant_steps = 0;
            stats.restarts += 1;
            trace!("Simulated Annealing: stagnated at iteration {}, restarting", iteration);
        }

        if schedule.cool() {
            stats.reheats += 1;
            trace!("Simulated Annealing: reheated at iteration {}", iteration);
        }
    }

    if tree.is_goal(current) || tree.is_goal(best) {
        let found = if tree.is_goal(current) { current } else { best };
        debug!("Simulated Annealing found solution in {} moves", tree.moves(found));
        return (tree.into_terminal(found, Provenance::Exact), stats);
    }

    let settled = if tree.h(best) < tree.h(current) { best } else { current };
    debug!(
        "Simulated Annealing returning best effort with h={} after {} restarts and {} reheats",
        tree.h(settled),
        stats.restarts,
        stats.reheats
    );
    (tree.into_terminal(settled, Provenance::BestEffort), stats)
}

/// Keeps the `width` best unseen successors of the whole beam each round.
pub fn local_beam(start: &Board, goal: &Board, config: &BeamConfig) -> Option<Terminal> {
    let mut tree = SearchTree::new(*goal, Strategy::LocalBeam);
    let root = tree.root(*start);
    let mut candidates = vec![root];
    let mut best = root;
    let mut visited: FxHashSet<Board> = FxHashSet::from_iter([*start]);
    let mut iteration = 0;

    while !candidates.is_empty() && iteration < config.max_iterations {
        let mut successors: Vec<NodeId> = Vec::new();
        for &hypothesis in &candidates {
            for next in tree.board(hypothesis).possible_moves() {
                if visited.insert(next) {
                    successors.push(tree.child(hypothesis, next));
                }
            }
        }

        for &successor in &successors {
            if tree.h(successor) < tree.h(best) {
                best = successor;
            }
            if tree.is_goal(successor) {
                debug!(
                    "Local Beam Search: solution found in {} moves at iteration {}",
                    tree.moves(successor),
                    iteration
                );
                return Some(tree.into_terminal(successor, Provenance::Exact));
            }
        }

        successors.sort_by_key(|&id| tree.h(id));
        successors.truncate(config.width);
        candidates = successors;
        iteration += 1;
    }

    debug!("Local Beam Search: no solution, reconstructing from best hypothesis (h={})", tree.h(best));
    match bfs_within(&mut tree, best) {
        Some(found) => Some(tree.into_terminal(found, Provenance::Reconstructed)),
        None => Some(tree.into_terminal(best, Provenance::BestEffort)),
    }
}

/// Order-preserving single-point crossover: the child keeps `x` up to the cut
/// and fills the rest with the tiles it lacks, in the order they appear in `y`.
pub(crate) fn crossover(x: &Board, y: &Board, cut: usize) -> Board {
    let head = &x.cells()[..cut];
    let mut cells = [0u8; CELLS];
    cells[..cut].copy_from_slice(head);

    let tail = y.cells().iter().copied().filter(|v| !head.contains(v));
    for (slot, value) in cells[cut..].iter_mut().zip(tail) {
        *slot = value;
    }

    // head and tail partition 0..=8, so this is always a permutation
    Board::new(cells).unwrap_or(*x)
}

/// Evolves a population of boards toward the goal. Crossover does not
/// respect slide adjacency, so the reported path is rebuilt by breadth-first
/// search through the fittest reachable individual.
pub fn genetic(start: &Board, goal: &Board, config: &GeneticConfig, rng: &mut dyn RngCore) -> Option<Terminal> {
    let population_size = config.population_size.max(1);
    let fitness = |board: &Board| board.heuristic(goal);

    let mut population: Vec<Board> = Vec::with_capacity(population_size);
    population.push(*start);
    {
        let mut seeds = SearchTree::new(*goal, Strategy::Genetic);
        let root = seeds.root(*start);
        while population.len() < population_size {
            let steps = rng.gen_range(config.min_seed_moves..=config.max_seed_moves.max(config.min_seed_moves));
            let end = walk(&mut seeds, root, steps, rng);
            population.push(*seeds.board(end));
        }
    }

    let mut reached_goal = false;
    for generation in 0..config.max_generations {
        let weights: Vec<f64> = population.iter().map(|b| 1.0 / (fitness(b) as f64 + 1.0)).collect();
        let Ok(selection) = WeightedIndex::new(&weights) else {
            break;
        };

        let mut next_population = Vec::with_capacity(population_size);
        for _ in 0..population_size {
            let x = population[selection.sample(rng)];
            let y = population[selection.sample(rng)];
            let mut child = crossover(&x, &y, rng.gen_range(0..CELLS));
            if rng.gen::<f64>() < config.mutation_rate {
                if let Some(&mutated) = child.possible_moves().choose(rng) {
                    child = mutated;
                }
            }
            next_population.push(child);
        }
        population = next_population;

        if population.contains(goal) {
            debug!("Genetic Algorithm reached the goal in generation {}", generation);
            reached_goal = true;
            break;
        }
        if generation % 100 == 0 {
            let best = population.iter().map(fitness).min().unwrap_or(0);
            trace!("Genetic Algorithm: generation {}, best fitness {}", generation, best);
        }
    }

    // crossover can produce boards of the wrong parity; those cannot be on a path
    let fittest = population
        .iter()
        .filter(|b| is_solvable(start, b))
        .min_by_key(|b| fitness(b))
        .copied();

    match fittest {
        Some(best) if !reached_goal => {
            debug!("Genetic Algorithm: no exact solution, routing through fittest (h={})", fitness(&best));
            let mut tree = SearchTree::new(*goal, Strategy::Genetic);
            let root = tree.root(*start);
            let through = bfs_within_to(&mut tree, root, &best)?;
            bfs_within(&mut tree, through).map(|found| tree.into_terminal(found, Provenance::Reconstructed))
        }
        _ => bfs_fallback(start, goal, Strategy::Genetic),
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
    fn simple_hill_climbing_descends_directly_when_possible() {
        let start = board("123405786");
        let mut rng = StdRng::seed_from_u64(1);
        let found = simple_hill_climbing(&start, &Board::solved(), &HillClimbingConfig::default(), &mut rng).unwrap();
        assert_eq!(found.provenance(), Provenance::Exact);
        assert_eq!(found.moves(), 2);
    }

    #[test]
    fn hill_climbing_falls_back_to_bfs_when_stuck() {
        let start = board("724506831");
        let config = HillClimbingConfig {
            max_restarts: 1,
            max_steps: 3,
            perturb_moves: 1,
        };
        let mut rng = StdRng::seed_from_u64(2);
        let found = steepest_hill_climbing(&start, &Board::solved(), &config, &mut rng).unwrap();
        assert_eq!(found.provenance(), Provenance::Reconstructed);
        assert_eq!(found.moves(), 20);
        assert_legal_chain(&found, &start);
    }

    #[test]
    fn stochastic_hill_climbing_has_no_fallback() {
        let start = board("724506831");
        let config = StochasticConfig {
            max_restarts: 2,
            max_steps: 5,
            perturb_moves: 1,
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert!(stochastic_hill_climbing(&start, &Board::solved(), &config, &mut rng).is_none());
    }

    #[test]
    fn stochastic_hill_climbing_solves_near_goal() {
        let start = board("123456708");
        let mut rng = StdRng::seed_from_u64(4);
        let found =
            stochastic_hill_climbing(&start, &Board::solved(), &StochasticConfig::default(), &mut rng).unwrap();
        assert!(found.is_goal());
        assert_legal_chain(&found, &start);
    }

    #[test]
    fn annealing_reports_best_effort_when_budget_is_tiny() {
        let start = board("724506831");
        let config = AnnealingConfig {
            max_iterations: 3,
            ..AnnealingConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let found = simulated_annealing(&start, &Board::solved(), &config, &mut rng).unwrap();
        assert_eq!(found.provenance(), Provenance::BestEffort);
        assert!(!found.is_goal());
        assert_legal_chain(&found, &start);
    }

    #[test]
    fn schedule_cools_geometrically_then_reheats_below_the_floor() {
        let config = AnnealingConfig {
            initial_temperature: 1.0,
            cooling_rate: 0.5,
            min_temperature: 0.2,
            reheat_temperature: 4.0,
            ..AnnealingConfig::default()
        };
        let mut schedule = CoolingSchedule::new(&config);

        assert!(!schedule.cool());
        assert_eq!(schedule.temperature, 0.5);
        assert!(!schedule.cool());
        assert_eq!(schedule.temperature, 0.25);
        assert!(schedule.cool());
        assert_eq!(schedule.temperature, 4.0);
        assert!(!schedule.cool());
        assert_eq!(schedule.temperature, 2.0);

        assert_eq!(schedule.acceptance(0.0), 1.0);
        assert!(schedule.acceptance(2.0) < schedule.acceptance(1.0));
    }

    #[test]
    fn annealing_restarts_on_stagnation_and_reheats() {
        let start = board("724506831");
        let config = AnnealingConfig {
            initial_temperature: 1.0,
            cooling_rate: 0.5,
            min_temperature: 0.1,
            reheat_temperature: 1.0,
            max_stagnant: 2,
            max_iterations: 200,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let (found, stats) = anneal(&start, &Board::solved(), &config, &mut rng);

        assert!(stats.restarts > 0);
        assert!(stats.reheats > 0);
        assert_legal_chain(&found, &start);
        assert_eq!(found.is_goal(), found.provenance() == Provenance::Exact);
    }

    #[test]
    fn beam_search_solves_short_instance() {
        let start = board("413726058");
        let found = local_beam(&start, &Board::solved(), &BeamConfig::default()).unwrap();
        assert!(found.is_goal());
        assert_legal_chain(&found, &start);
    }

    #[test]
    fn beam_search_reconstructs_from_best_hypothesis() {
        let start = board("724506831");
        let config = BeamConfig {
            width: 1,
            max_iterations: 2,
        };
        let found = local_beam(&start, &Board::solved(), &config).unwrap();
        assert_eq!(found.provenance(), Provenance::Reconstructed);
        assert!(found.is_goal());
        assert_legal_chain(&found, &start);
    }

    #[test]
    fn crossover_repairs_into_a_permutation() {
        let x = board("123456780");
        let y = board("876543210");
        assert_eq!(crossover(&x, &y, 0), y);
        assert_eq!(crossover(&x, &y, 9), x);
        let child = crossover(&x, &y, 4);
        assert_eq!(child, board("123487650"));
    }

    #[test]
    fn genetic_path_is_legal_and_reaches_goal() {
        let start = board("413726058");
        let config = GeneticConfig {
            population_size: 20,
            max_generations: 30,
            ..GeneticConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(6);
        let found = genetic(&start, &Board::solved(), &config, &mut rng).unwrap();
        assert_eq!(found.provenance(), Provenance::Reconstructed);
        assert!(found.is_goal());
        assert_legal_chain(&found, &start);
    }
}
