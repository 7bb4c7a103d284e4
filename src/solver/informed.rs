use log::{debug, trace};
use rustc_hash::FxHashSet;

use crate::board::Board;
use crate::node::{NodeId, Provenance, SearchTree, Terminal};
use crate::solver::uninformed::best_first;
use crate::strategy::Strategy;
use crate::traits::puzzle::Heuristic;

/// Best-first on the heuristic alone. Reaches the goal but not necessarily
/// by a shortest path.
pub fn greedy(start: &Board, goal: &Board) -> Option<Terminal> {
    let found = best_first(start, goal, Strategy::Greedy, SearchTree::h);
    match &found {
        Some(terminal) => debug!("Greedy found solution in {} moves", terminal.moves()),
        None => debug!("Greedy failed to find solution"),
    }
    found
}

/// Best-first on `moves + h`. Manhattan distance is admissible and
/// consistent, so the first goal popped is optimal.
pub fn a_star(start: &Board, goal: &Board) -> Option<Terminal> {
    let found = best_first(start, goal, Strategy::AStar, SearchTree::f);
    match &found {
        Some(terminal) => debug!("A* found solution in {} moves", terminal.moves()),
        None => debug!("A* failed to find solution"),
    }
    found
}

enum Bound {
    Found(NodeId),
    Exceeded(u32),
    Exhausted,
}

/// Iterative deepening on the f-cost bound. Each round raises the bound to
/// the smallest f that broke the previous one.
pub fn ida_star(start: &Board, goal: &Board) -> Option<Terminal> {
    let mut bound = start.heuristic(goal);

    loop {
        let mut tree = SearchTree::new(*goal, Strategy::IdaStar);
        let root = tree.root(*start);
        let mut on_path = FxHashSet::default();

        match bounded_search(&mut tree, root, bound, &mut on_path) {
            Bound::Found(id) => {
                debug!("IDA* found solution in {} moves", tree.moves(id));
                return Some(tree.into_terminal(id, Provenance::Exact));
            }
            Bound::Exceeded(next) => {
                trace!("IDA*: bound {} -> {} after {} nodes", bound, next, tree.len());
                bound = next;
            }
            Bound::Exhausted => {
                debug!("IDA* failed to find solution");
                return None;
            }
        }
    }
}

fn bounded_search(tree: &mut SearchTree, current: NodeId, bound: u32, on_path: &mut FxHashSet<Board>) -> Bound {
    let f = tree.f(current);
    if f > bound {
        return Bound::Exceeded(f);
    }
    if tree.is_goal(current) {
        return Bound::Found(current);
    }

    let mut min_exceeded: Option<u32> = None;
    on_path.insert(*tree.board(current));

    for child in tree.expand(current) {
        if on_path.contains(tree.board(child)) {
            continue;
        }
        match bounded_search(tree, child, bound, on_path) {
            Bound::Found(id) => return Bound::Found(id),
            Bound::Exceeded(next) => {
                min_exceeded = Some(min_exceeded.map_or(next, |m| m.min(next)));
            }
            Bound::Exhausted => {}
        }
    }

    on_path.remove(tree.board(current));
    match min_exceeded {
        Some(next) => Bound::Exceeded(next),
        None => Bound::Exhausted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    #[test]
    fn informed_searches_solve_short_instance() {
        let start = board("413726058");
        let goal = Board::solved();
        assert_eq!(a_star(&start, &goal).unwrap().moves(), 6);
        assert_eq!(ida_star(&start, &goal).unwrap().moves(), 6);
        let greedy = greedy(&start, &goal).unwrap();
        assert!(greedy.is_goal());
        assert!(greedy.moves() >= 6);
    }

    #[test]
    fn ida_star_matches_a_star_on_longer_instance() {
        let start = board("123740865");
        let goal = Board::solved();
        let a = a_star(&start, &goal).unwrap();
        let ida = ida_star(&start, &goal).unwrap();
        assert_eq!(a.moves(), ida.moves());
        assert_eq!(ida.provenance(), Provenance::Exact);
    }

    #[test]
    fn greedy_exhausts_when_goal_is_unreachable() {
        let start = board("123456870");
        let goal = board("123456780");
        assert!(greedy(&start, &goal).is_none());
    }
}
