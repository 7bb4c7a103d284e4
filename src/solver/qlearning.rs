//! Tabular Q-learning over (board, blank direction) pairs. Each solve trains
//! a fresh table, then follows it greedily from the start.

use indicatif::ProgressBar;
use log::{debug, trace};
use ordered_float::OrderedFloat;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::board::{Board, Direction};
use crate::config::QLearningConfig;
use crate::node::{Provenance, SearchTree, Terminal};
use crate::strategy::Strategy;
use crate::traits::puzzle::Heuristic;

#[derive(Debug, Clone)]
pub struct QTable {
    values: FxHashMap<(Board, Direction), f64>,
    /// Value of a pair that has never been updated.
    q_init: f64,
}

impl QTable {
    pub fn new(q_init: f64) -> Self {
        Self {
            values: FxHashMap::default(),
            q_init,
        }
    }

    pub fn get(&self, board: &Board, action: Direction) -> f64 {
        self.values.get(&(*board, action)).copied().unwrap_or(self.q_init)
    }

    pub fn set(&mut self, board: Board, action: Direction, value: f64) {
        self.values.insert((board, action), value);
    }

    pub fn max_q(&self, board: &Board, actions: &[Direction]) -> f64 {
        actions
            .iter()
            .map(|&a| OrderedFloat(self.get(board, a)))
            .max()
            .map_or(0.0, |q| q.into_inner())
    }

    /// Every action tied for the highest value.
    pub fn best_actions(&self, board: &Board, actions: &[Direction]) -> Vec<Direction> {
        let best = OrderedFloat(self.max_q(board, actions));
        actions
            .iter()
            .copied()
            .filter(|&a| OrderedFloat(self.get(board, a)) == best)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub struct QLearner<'a> {
    table: QTable,
    config: &'a QLearningConfig,
    goal: Board,
    epsilon: f64,
}

impl<'a> QLearner<'a> {
    pub fn new(goal: Board, config: &'a QLearningConfig) -> Self {
        Self {
            table: QTable::new(config.q_init),
            config,
            goal,
            epsilon: config.epsilon,
        }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn greedy_action(&self, board: &Board, actions: &[Direction], rng: &mut dyn RngCore) -> Option<Direction> {
        self.table.best_actions(board, actions).choose(rng).copied()
    }

    fn select_action(&self, board: &Board, actions: &[Direction], rng: &mut dyn RngCore) -> Option<Direction> {
        if rng.gen::<f64>() < self.epsilon {
            actions.choose(rng).copied()
        } else {
            self.greedy_action(board, actions, rng)
        }
    }

    fn reward(&self, from: &Board, to: &Board) -> f64 {
        if *to == self.goal {
            self.config.goal_reward
        } else if to.heuristic(&self.goal) < from.heuristic(&self.goal) {
            self.config.improve_reward
        } else {
            self.config.worsen_reward
        }
    }

    /// Q(s,a) <- Q(s,a) + alpha * (r + gamma * max Q(s',.) - Q(s,a))
    fn update(&mut self, board: Board, action: Direction, reward: f64, next: &Board) {
        let current_q = self.table.get(&board, action);
        let max_next_q = if *next == self.goal {
            0.0
        } else {
            self.table.max_q(next, &next.legal_moves())
        };
        let td_target = reward + self.config.discount_factor * max_next_q;
        let new_q = current_q + self.config.learning_rate * (td_target - current_q);
        self.table.set(board, action, new_q);
    }

    /// Runs every training episode from `start`. Returns how many reached the goal.
    pub fn train(&mut self, start: &Board, rng: &mut dyn RngCore, progress: Option<&ProgressBar>) -> u32 {
        if let Some(pb) = progress {
            pb.set_length(u64::from(self.config.episodes));
            pb.set_position(0);
        }
        let mut successes = 0;

        for episode in 0..self.config.episodes {
            let mut state = *start;
            for _ in 0..self.config.max_steps {
                let actions = state.legal_moves();
                let Some(action) = self.select_action(&state, &actions, rng) else {
                    break;
                };
                let Some(next) = state.try_slide(action) else {
                    break;
                };
                let reward = self.reward(&state, &next);
                self.update(state, action, reward, &next);
                state = next;
                if state == self.goal {
                    successes += 1;
                    break;
                }
            }

            self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.min_epsilon);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            if episode % 1000 == 0 {
                trace!(
                    "Q-Learning: episode {}, epsilon {:.3}, table size {}",
                    episode,
                    self.epsilon,
                    self.table.len()
                );
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        successes
    }

    /// Follows the table greedily from `start`, stopping on the goal, a
    /// revisited board, or the step cap.
    pub fn rollout(&self, start: &Board, rng: &mut dyn RngCore) -> Option<Terminal> {
        let mut tree = SearchTree::new(self.goal, Strategy::QLearning);
        let mut current = tree.root(*start);
        let mut visited = FxHashSet::from_iter([*start]);

        for _ in 0..self.config.rollout_steps {
            if tree.is_goal(current) {
                return Some(tree.into_terminal(current, Provenance::Exact));
            }
            let board = *tree.board(current);
            let next = self
                .greedy_action(&board, &board.legal_moves(), rng)
                .and_then(|action| board.try_slide(action))?;
            if !visited.insert(next) {
                trace!("Q-Learning: rollout cycled after {} moves", tree.moves(current));
                return None;
            }
            current = tree.child(current, next);
        }

        tree.is_goal(current)
            .then(|| tree.into_terminal(current, Provenance::Exact))
    }
}

pub fn solve(
    start: &Board,
    goal: &Board,
    config: &QLearningConfig,
    rng: &mut dyn RngCore,
    progress: Option<&ProgressBar>,
) -> Option<Terminal> {
    let mut learner = QLearner::new(*goal, config);
    let successes = learner.train(start, rng, progress);
    debug!(
        "Q-Learning: {} of {} episodes reached the goal, {} table entries",
        successes,
        config.episodes,
        learner.table().len()
    );

    let found = learner.rollout(start, rng);
    match &found {
        Some(terminal) => debug!("Q-Learning found solution in {} moves", terminal.moves()),
        None => debug!("Q-Learning failed to find solution"),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn unseen_pairs_use_initial_value() {
        let mut table = QTable::new(0.5);
        let board = Board::solved();
        assert_eq!(table.get(&board, Direction::Up), 0.5);

        table.set(board, Direction::Left, 2.0);
        assert_eq!(table.max_q(&board, &board.legal_moves()), 2.0);
        assert_eq!(table.best_actions(&board, &board.legal_moves()), vec![Direction::Left]);
    }

    #[test]
    fn ties_keep_every_best_action() {
        let table = QTable::new(0.0);
        let board = Board::solved();
        assert_eq!(table.best_actions(&board, &board.legal_moves()).len(), 2);
    }

    #[test]
    fn learns_a_single_slide() {
        let start: Board = "123456708".parse().unwrap();
        let config = QLearningConfig {
            episodes: 200,
            ..QLearningConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let found = solve(&start, &Board::solved(), &config, &mut rng, None).unwrap();
        assert_eq!(found.moves(), 1);
        assert_eq!(found.moves_str(), "R");
    }

    #[test]
    fn epsilon_decays_to_its_floor() {
        let start: Board = "123456708".parse().unwrap();
        let config = QLearningConfig {
            episodes: 2000,
            max_steps: 1,
            ..QLearningConfig::default()
        };
        let goal = Board::solved();
        let mut learner = QLearner::new(goal, &config);
        let mut rng = StdRng::seed_from_u64(10);
        learner.train(&start, &mut rng, None);
        assert_eq!(learner.epsilon(), config.min_epsilon);
        assert!(!learner.table().is_empty());
    }
}
