//! Search nodes live in an arena and point at their parent by index, so a
//! back-pointer chain can never form a cycle: a parent is always pushed
//! before its children and is never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Direction};
use crate::strategy::Strategy;
use crate::traits::puzzle::Heuristic;

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct SearchNode {
    pub board: Board,
    /// Slides from the root of the search (g-cost).
    pub moves: u32,
    pub parent: Option<NodeId>,
    h: Option<u32>,
}

impl SearchNode {
    pub fn cached_h(&self) -> Option<u32> {
        self.h
    }
}

/// How the returned chain was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// The named strategy reached the goal itself.
    Exact,
    /// The strategy gave up and a breadth-first search produced the path.
    Reconstructed,
    /// The chain ends on the best board found, which is not the goal.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub board: Board,
    pub moves: u32,
}

#[derive(Debug, Clone)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
    goal: Board,
    eager_heuristic: bool,
}

impl SearchTree {
    pub fn new(goal: Board, strategy: Strategy) -> Self {
        Self {
            nodes: Vec::new(),
            goal,
            eager_heuristic: strategy.uses_heuristic(),
        }
    }

    fn push(&mut self, board: Board, moves: u32, parent: Option<NodeId>) -> NodeId {
        let h = self.eager_heuristic.then(|| board.heuristic(&self.goal));
        self.nodes.push(SearchNode { board, moves, parent, h });
        self.nodes.len() - 1
    }

    pub fn root(&mut self, board: Board) -> NodeId {
        self.push(board, 0, None)
    }

    pub fn child(&mut self, parent: NodeId, board: Board) -> NodeId {
        let moves = self.nodes[parent].moves + 1;
        self.push(board, moves, Some(parent))
    }

    /// Children of `parent` for every legal slide, in up, down, left, right order.
    pub fn expand(&mut self, parent: NodeId) -> Vec<NodeId> {
        self.nodes[parent]
            .board
            .possible_moves()
            .into_iter()
            .map(|board| self.child(parent, board))
            .collect()
    }

    pub fn node(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id]
    }

    pub fn board(&self, id: NodeId) -> &Board {
        &self.nodes[id].board
    }

    pub fn moves(&self, id: NodeId) -> u32 {
        self.nodes[id].moves
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Manhattan distance to the goal; cached when the strategy computes it eagerly.
    pub fn h(&self, id: NodeId) -> u32 {
        let node = &self.nodes[id];
        node.h.unwrap_or_else(|| node.board.heuristic(&self.goal))
    }

    pub fn f(&self, id: NodeId) -> u32 {
        self.moves(id) + self.h(id)
    }

    pub fn goal(&self) -> &Board {
        &self.goal
    }

    pub fn is_goal(&self, id: NodeId) -> bool {
        self.nodes[id].board == self.goal
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids from the root down to `id`.
    pub fn chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    pub fn path(&self, id: NodeId) -> Vec<PathStep> {
        self.chain(id)
            .into_iter()
            .map(|idx| PathStep {
                board: self.nodes[idx].board,
                moves: self.nodes[idx].moves,
            })
            .collect()
    }

    /// Keeps only the chain ending at `id`; the rest of the arena is dropped.
    pub fn into_terminal(self, id: NodeId, provenance: Provenance) -> Terminal {
        let chain = self.chain(id);
        let mut nodes = Vec::with_capacity(chain.len());

        for (new_idx, old_idx) in chain.into_iter().enumerate() {
            let node = &self.nodes[old_idx];
            nodes.push(SearchNode {
                board: node.board,
                moves: node.moves,
                parent: new_idx.checked_sub(1),
                h: node.h,
            });
        }

        let id = nodes.len() - 1;
        Terminal {
            tree: SearchTree {
                nodes,
                goal: self.goal,
                eager_heuristic: self.eager_heuristic,
            },
            id,
            provenance,
        }
    }
}

/// The node a strategy stopped on, together with its back-pointer chain.
#[derive(Debug, Clone)]
pub struct Terminal {
    tree: SearchTree,
    id: NodeId,
    provenance: Provenance,
}

impl Terminal {
    pub fn board(&self) -> &Board {
        self.tree.board(self.id)
    }

    pub fn moves(&self) -> u32 {
        self.tree.moves(self.id)
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_goal(&self) -> bool {
        self.tree.is_goal(self.id)
    }

    pub fn node(&self) -> &SearchNode {
        self.tree.node(self.id)
    }

    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    pub fn path(&self) -> Vec<PathStep> {
        self.tree.path(self.id)
    }

    pub fn boards(&self) -> Vec<Board> {
        self.path().into_iter().map(|step| step.board).collect()
    }

    /// Blank motions along the chain. Every link in a chain is a single slide.
    pub fn directions(&self) -> Vec<Direction> {
        self.boards()
            .windows(2)
            .filter_map(|pair| pair[0].direction_to(&pair[1]))
            .collect()
    }

    pub fn moves_str(&self) -> String {
        self.directions().iter().map(|d| d.to_char()).collect()
    }
}

/// Ordered `(board, moves)` list from the start to the terminal node; empty
/// when there is no solution.
pub fn solution_path(terminal: Option<&Terminal>) -> Vec<PathStep> {
    terminal.map(Terminal::path).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstructs_chain_from_root() {
        let goal = Board::solved();
        let mut tree = SearchTree::new(goal, Strategy::AStar);
        let start: Board = "123405786".parse().unwrap();
        let root = tree.root(start);
        let a = tree.child(root, start.slide(Direction::Right).unwrap());
        let _sibling = tree.child(root, start.slide(Direction::Up).unwrap());
        let next = tree.board(a).slide(Direction::Down).unwrap();
        let b = tree.child(a, next);

        assert!(tree.is_goal(b));
        assert_eq!(tree.chain(b), vec![root, a, b]);
        assert_eq!(tree.h(b), 0);
        assert_eq!(tree.node(root).cached_h(), Some(2));

        let terminal = tree.into_terminal(b, Provenance::Exact);
        assert_eq!(terminal.tree().len(), 3);
        assert_eq!(terminal.moves(), 2);
        assert_eq!(terminal.moves_str(), "RD");
        let path = terminal.path();
        assert_eq!(path.first().unwrap().board, start);
        assert_eq!(path.iter().map(|s| s.moves).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn blind_strategies_skip_heuristic() {
        let mut tree = SearchTree::new(Board::solved(), Strategy::Bfs);
        let root = tree.root("123456708".parse().unwrap());
        assert_eq!(tree.node(root).cached_h(), None);
        assert_eq!(tree.h(root), 1);
    }

    #[test]
    fn no_terminal_gives_empty_path() {
        assert!(solution_path(None).is_empty());
    }
}
