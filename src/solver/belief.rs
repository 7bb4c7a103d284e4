//! Search when the board is not fully known: AND-OR search with a
//! deadline, conformant planning over a set of possible starts, and search
//! driven by partial percepts around the blank.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::board::{Board, Direction, CELLS, SIDE};
use crate::config::{AndOrConfig, NoObservationConfig, PartialObservationConfig};
use crate::node::{NodeId, Provenance, SearchTree, Terminal};
use crate::solver::{Outcome, Problem};
use crate::strategy::Strategy;
use crate::traits::puzzle::Heuristic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObservedCell {
    pub row: usize,
    pub col: usize,
    pub value: u8,
}

/// What is sensed on a board: the blank and its orthogonal neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Percept {
    pub cells: Vec<ObservedCell>,
}

impl Percept {
    pub fn sense(board: &Board) -> Self {
        let (row, col) = board.blank_position();
        let mut cells = vec![ObservedCell { row, col, value: 0 }];
        for dir in Direction::ALL {
            let (dr, dc) = dir.as_offset();
            let (r, c) = (row as isize + dr, col as isize + dc);
            if (0..SIDE as isize).contains(&r) && (0..SIDE as isize).contains(&c) {
                let (r, c) = (r as usize, c as usize);
                cells.push(ObservedCell {
                    row: r,
                    col: c,
                    value: board.get(r, c),
                });
            }
        }
        cells.sort();
        Self { cells }
    }
}

/// The cells known on one step of a belief-state plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub step: usize,
    pub cells: Vec<ObservedCell>,
}

impl Observation {
    /// Cells every member of `belief` agrees on.
    fn agreed(step: usize, belief: &[Board]) -> Self {
        let mut cells = Vec::new();
        if let Some(first) = belief.first() {
            for idx in 0..CELLS {
                let value = first.cells()[idx];
                if belief.iter().all(|b| b.cells()[idx] == value) {
                    cells.push(ObservedCell {
                        row: idx / SIDE,
                        col: idx % SIDE,
                        value,
                    });
                }
            }
        }
        Self { step, cells }
    }

    /// Grid form for rendering; unknown cells are `None`.
    pub fn known_cells(&self) -> [Option<u8>; CELLS] {
        let mut grid = [None; CELLS];
        for cell in &self.cells {
            grid[cell.row * SIDE + cell.col] = Some(cell.value);
        }
        grid
    }
}

enum AndOrResult {
    Found(NodeId),
    Exceeded(u32),
    Exhausted,
    TimedOut,
}

struct AndOrSearch {
    tree: SearchTree,
    deadline: Instant,
    on_path: FxHashSet<Board>,
}

impl AndOrSearch {
    /// A board: succeeds if any action leads to a solvable AND node.
    fn or_node(&mut self, node: NodeId, bound: u32) -> AndOrResult {
        if Instant::now() >= self.deadline {
            return AndOrResult::TimedOut;
        }
        let f = self.tree.f(node);
        if f > bound {
            return AndOrResult::Exceeded(f);
        }
        if self.tree.is_goal(node) {
            return AndOrResult::Found(node);
        }

        let board = *self.tree.board(node);
        self.on_path.insert(board);
        let mut min_exceeded: Option<u32> = None;

        for child in self.tree.expand(node) {
            if self.on_path.contains(self.tree.board(child)) {
                continue;
            }
            match self.and_node(&[child], bound) {
                AndOrResult::Exceeded(next) => min_exceeded = Some(min_exceeded.map_or(next, |m| m.min(next))),
                AndOrResult::Exhausted => {}
                done => return done,
            }
        }

        self.on_path.remove(&board);
        min_exceeded.map_or(AndOrResult::Exhausted, AndOrResult::Exceeded)
    }

    /// An action: every outcome must be solved. Slides are deterministic, so
    /// there is exactly one.
    fn and_node(&mut self, outcomes: &[NodeId], bound: u32) -> AndOrResult {
        let mut plan = AndOrResult::Exhausted;
        for &outcome in outcomes {
            match self.or_node(outcome, bound) {
                AndOrResult::Found(id) => plan = AndOrResult::Found(id),
                other => return other,
            }
        }
        plan
    }
}

/// AND-OR graph search deepened on `g + h`, abandoned once the wall-clock
/// timeout passes.
pub fn and_or_search(start: &Board, goal: &Board, config: &AndOrConfig) -> Option<Terminal> {
    let deadline = Instant::now() + config.timeout();
    let mut bound = start.heuristic(goal);

    for round in 0..config.max_iterations {
        let mut search = AndOrSearch {
            tree: SearchTree::new(*goal, Strategy::AndOrGraph),
            deadline,
            on_path: FxHashSet::default(),
        };
        let root = search.tree.root(*start);

        match search.or_node(root, bound) {
            AndOrResult::Found(id) => {
                debug!("AND-OR found solution in {} moves", search.tree.moves(id));
                return Some(search.tree.into_terminal(id, Provenance::Exact));
            }
            AndOrResult::Exceeded(next) => {
                trace!("AND-OR: round {} bound {} -> {}", round, bound, next);
                bound = next;
            }
            AndOrResult::Exhausted => break,
            AndOrResult::TimedOut => {
                debug!("AND-OR timed out after {} rounds", round);
                return None;
            }
        }
    }

    debug!("AND-OR failed to find solution");
    None
}

/// Canonical form of a belief state: sorted and deduplicated.
fn normalize(mut belief: Vec<Board>) -> Vec<Board> {
    belief.sort();
    belief.dedup();
    belief
}

fn belief_h(belief: &[Board], goal: &Board) -> u32 {
    belief.iter().map(|b| b.heuristic(goal)).min().unwrap_or(0)
}

/// Every member slides the same way; a member whose blank cannot move that
/// way stays put.
fn apply_blind(belief: &[Board], dir: Direction) -> Vec<Board> {
    normalize(belief.iter().map(|b| b.try_slide(dir).unwrap_or(*b)).collect())
}

struct PlanStep {
    belief: Vec<Board>,
    parent: Option<usize>,
    action: Option<Direction>,
    depth: u32,
}

/// Conformant planning: finds one action sequence that drives every
/// possible start to the goal, then replays it from the true start.
pub fn no_observation(problem: &Problem, config: &NoObservationConfig) -> Outcome {
    let goal = &problem.goal;
    let initial = normalize(problem.possible_starts.clone());
    let threshold = config.heuristic_factor * belief_h(&initial, goal).max(1);

    let mut steps = vec![PlanStep {
        belief: initial.clone(),
        parent: None,
        action: None,
        depth: 0,
    }];
    let mut frontier = BinaryHeap::from([(Reverse(belief_h(&initial, goal)), Reverse(0usize), 0usize)]);
    let mut seen: FxHashSet<Vec<Board>> = FxHashSet::from_iter([initial]);
    let mut expansions = 0;

    while let Some((_, _, idx)) = frontier.pop() {
        if steps[idx].belief == [*goal] {
            return replay_plan(problem, &steps, idx);
        }
        if expansions >= config.max_expansions {
            break;
        }
        expansions += 1;

        for dir in Direction::ALL {
            let next = apply_blind(&steps[idx].belief, dir);
            if next.len() > config.max_belief_size || seen.contains(&next) {
                continue;
            }
            let h = belief_h(&next, goal);
            if h > threshold {
                continue;
            }
            seen.insert(next.clone());

            let depth = steps[idx].depth + 1;
            steps.push(PlanStep {
                belief: next,
                parent: Some(idx),
                action: Some(dir),
                depth,
            });
            let id = steps.len() - 1;
            frontier.push((Reverse(depth + h), Reverse(id), id));
        }
    }

    debug!("Search with No Observation: no plan after {} expansions", expansions);
    Outcome::none()
}

fn replay_plan(problem: &Problem, steps: &[PlanStep], last: usize) -> Outcome {
    let mut chain = vec![last];
    let mut current = last;
    while let Some(parent) = steps[current].parent {
        chain.push(parent);
        current = parent;
    }
    chain.reverse();

    let trace = chain
        .iter()
        .enumerate()
        .map(|(step, &idx)| Observation::agreed(step, &steps[idx].belief))
        .collect();

    let mut tree = SearchTree::new(problem.goal, Strategy::NoObservation);
    let mut current = tree.root(problem.start);
    for dir in chain.iter().filter_map(|&idx| steps[idx].action) {
        // a bump against the frame leaves the true board unchanged
        if let Some(next) = tree.board(current).try_slide(dir) {
            current = tree.child(current, next);
        }
    }

    debug!(
        "Search with No Observation found a {}-action plan ({} slides from the true start)",
        chain.len() - 1,
        tree.moves(current)
    );
    let provenance = if tree.is_goal(current) {
        Provenance::Exact
    } else {
        Provenance::BestEffort
    };
    Outcome {
        terminal: Some(tree.into_terminal(current, provenance)),
        trace,
    }
}

struct BeliefNode {
    members: Vec<NodeId>,
    parent: Option<usize>,
    depth: u32,
}

/// Best-first search over belief states refined by percepts. After every
/// action the predicted belief splits into one successor per percept.
pub fn partial_observation(start: &Board, goal: &Board, config: &PartialObservationConfig) -> Outcome {
    let mut tree = SearchTree::new(*goal, Strategy::PartialObservation);
    let root = tree.root(*start);
    let members_h = |tree: &SearchTree, members: &[NodeId]| members.iter().map(|&m| tree.h(m)).min().unwrap_or(0);

    let mut beliefs = vec![BeliefNode {
        members: vec![root],
        parent: None,
        depth: 0,
    }];
    let mut frontier = BinaryHeap::from([(Reverse(tree.h(root)), Reverse(0usize), 0usize)]);
    let mut seen: FxHashSet<Vec<Board>> = FxHashSet::from_iter([vec![*start]]);
    let mut expansions = 0;

    while let Some((_, _, idx)) = frontier.pop() {
        if let Some(&found) = beliefs[idx].members.iter().find(|&&m| tree.is_goal(m)) {
            let trace = percept_trace(&tree, &beliefs, idx);
            debug!(
                "Search with Partial Observations found solution in {} moves after {} expansions",
                tree.moves(found),
                expansions
            );
            return Outcome {
                terminal: Some(tree.into_terminal(found, Provenance::Exact)),
                trace,
            };
        }
        if expansions >= config.max_expansions {
            break;
        }
        expansions += 1;

        for dir in Direction::ALL {
            let mut by_percept: FxHashMap<Percept, Vec<NodeId>> = FxHashMap::default();
            let members = beliefs[idx].members.clone();
            for member in members {
                if let Some(next) = tree.board(member).try_slide(dir) {
                    let child = tree.child(member, next);
                    by_percept.entry(Percept::sense(&next)).or_default().push(child);
                }
            }

            let mut partitions: Vec<(Percept, Vec<NodeId>)> = by_percept.into_iter().collect();
            partitions.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, members) in partitions {
                let key = normalize(members.iter().map(|&m| *tree.board(m)).collect());
                if !seen.insert(key) {
                    continue;
                }
                let depth = beliefs[idx].depth + 1;
                let priority = depth + members_h(&tree, &members);
                beliefs.push(BeliefNode {
                    members,
                    parent: Some(idx),
                    depth,
                });
                let id = beliefs.len() - 1;
                frontier.push((Reverse(priority), Reverse(id), id));
            }
        }
    }

    debug!("Search with Partial Observations failed after {} expansions", expansions);
    Outcome::none()
}

/// Per step of the chain ending at `last`, the cells sensed on that step.
fn percept_trace(tree: &SearchTree, beliefs: &[BeliefNode], last: usize) -> Vec<Observation> {
    let mut chain = vec![last];
    let mut current = last;
    while let Some(parent) = beliefs[current].parent {
        chain.push(parent);
        current = parent;
    }
    chain.reverse();

    chain
        .into_iter()
        .enumerate()
        .map(|(step, idx)| {
            let boards: Vec<Board> = beliefs[idx].members.iter().map(|&m| *tree.board(m)).collect();
            let mut percepts: Vec<Percept> = boards.iter().map(Percept::sense).collect();
            percepts.sort();
            percepts.dedup();
            // members of one partition share a percept
            let cells = match percepts.as_slice() {
                [single] => single.cells.clone(),
                _ => Observation::agreed(step, &boards).cells,
            };
            Observation { step, cells }
        })
        .collect()
}
