use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::board::Board;
use crate::config::IdsConfig;
use crate::node::{NodeId, Provenance, SearchTree, Terminal};
use crate::strategy::Strategy;

pub fn bfs(start: &Board, goal: &Board) -> Option<Terminal> {
    let mut tree = SearchTree::new(*goal, Strategy::Bfs);
    let root = tree.root(*start);
    let mut queue = VecDeque::from([root]);
    let mut visited = FxHashSet::default();

    while let Some(current) = queue.pop_front() {
        if tree.is_goal(current) {
            debug!("BFS found solution in {} moves, {} nodes", tree.moves(current), tree.len());
            return Some(tree.into_terminal(current, Provenance::Exact));
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

    debug!("BFS failed to find solution");
    None
}

/// Depth-first search. A board is re-expanded only when reached with fewer
/// moves than any earlier visit.
pub fn dfs(start: &Board, goal: &Board) -> Option<Terminal> {
    let mut tree = SearchTree::new(*goal, Strategy::Dfs);
    let root = tree.root(*start);
    let mut stack = vec![root];
    let mut best_moves: FxHashMap<Board, u32> = FxHashMap::default();
    let mut explored: u64 = 0;

    while let Some(current) = stack.pop() {
        explored += 1;
        let moves = tree.moves(current);
        let board = *tree.board(current);

        if best_moves.get(&board).is_some_and(|&seen| seen <= moves) {
            continue;
        }
        best_moves.insert(board, moves);

        if tree.is_goal(current) {
            debug!("DFS found solution in {} moves, explored {} states", moves, explored);
            return Some(tree.into_terminal(current, Provenance::Exact));
        }

        for child in tree.expand(current) {
            let improves = best_moves
                .get(tree.board(child))
                .map_or(true, |&seen| seen > moves + 1);
            if improves {
                stack.push(child);
            }
        }
    }

    debug!("DFS failed to find solution, explored {} states", explored);
    None
}

/// Uniform-cost search on path length; equal costs pop first-in first-out.
pub fn ucs(start: &Board, goal: &Board) -> Option<Terminal> {
    let found = best_first(start, goal, Strategy::Ucs, |tree, id| tree.moves(id));
    match &found {
        Some(terminal) => debug!("UCS found solution in {} moves", terminal.moves()),
        None => debug!("UCS failed to find solution"),
    }
    found
}

/// Shared open/closed-list loop for the priority-ordered strategies.
pub(crate) fn best_first<F>(start: &Board, goal: &Board, strategy: Strategy, priority: F) -> Option<Terminal>
where
    F: Fn(&SearchTree, NodeId) -> u32,
{
    let mut tree = SearchTree::new(*goal, strategy);
    let root = tree.root(*start);
    let mut open_list = BinaryHeap::<(Reverse<u32>, Reverse<u64>, NodeId)>::new();
    let mut closed_list = FxHashSet::default();
    let mut sequence: u64 = 0;

    open_list.push((Reverse(priority(&tree, root)), Reverse(sequence), root));

    while let Some((Reverse(_priority), _, current)) = open_list.pop() {
        if tree.is_goal(current) {
            return Some(tree.into_terminal(current, Provenance::Exact));
        }

        if closed_list.insert(*tree.board(current)) {
            for child in tree.expand(current) {
                if !closed_list.contains(tree.board(child)) {
                    sequence += 1;
                    open_list.push((Reverse(priority(&tree, child)), Reverse(sequence), child));
                }
            }
        }
    }

    None
}

/// Iterative deepening: depth-limited DFS with bounds 0, 1, 2, ... The first
/// bound that succeeds gives a shortest path.
pub fn ids(start: &Board, goal: &Board, config: &IdsConfig) -> Option<Terminal> {
    for depth_limit in 0..config.max_depth {
        let mut tree = SearchTree::new(*goal, Strategy::Ids);
        let root = tree.root(*start);
        // shallowest depth each board was reached at during this round
        let mut reached: FxHashMap<Board, u32> = FxHashMap::default();

        if let Some(found) = depth_limited(&mut tree, root, depth_limit, &mut reached) {
            debug!("IDS found solution in {} moves at depth {}", tree.moves(found), depth_limit);
            return Some(tree.into_terminal(found, Provenance::Exact));
        }
        trace!("IDS: depth {} exhausted after {} nodes", depth_limit, tree.len());
    }

    debug!("IDS failed to find solution");
    None
}

fn depth_limited(
    tree: &mut SearchTree,
    current: NodeId,
    depth_limit: u32,
    reached: &mut FxHashMap<Board, u32>,
) -> Option<NodeId> {
    if tree.is_goal(current) {
        return Some(current);
    }
    let moves = tree.moves(current);
    if moves >= depth_limit {
        return None;
    }
    reached.insert(*tree.board(current), moves);

    for child in tree.expand(current) {
        let shallower = reached
            .get(tree.board(child))
            .map_or(true, |&depth| moves + 1 < depth);
        if shallower {
            if let Some(found) = depth_limited(tree, child, depth_limit, reached) {
                return Some(found);
            }
        }
    }

    None
}
