use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PuzzleError;

/// Broad class of a strategy, used to group comparison output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Family {
    Uninformed,
    Informed,
    Local,
    Constraint,
    Belief,
    Reinforcement,
}

/// Every search strategy the solver offers. Each has a stable string tag,
/// used at the display/CLI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Strategy {
    Bfs,
    Dfs,
    Ucs,
    Ids,
    Greedy,
    AStar,
    IdaStar,
    SimpleHillClimbing,
    SteepestHillClimbing,
    StochasticHillClimbing,
    SimulatedAnnealing,
    LocalBeam,
    Genetic,
    Backtracking,
    Ac3,
    GenerateAndTest,
    AndOrGraph,
    NoObservation,
    PartialObservation,
    QLearning,
}

impl Strategy {
    pub const ALL: [Strategy; 20] = [
        Strategy::Bfs,
        Strategy::Dfs,
        Strategy::Ucs,
        Strategy::Ids,
        Strategy::Greedy,
        Strategy::AStar,
        Strategy::IdaStar,
        Strategy::SimpleHillClimbing,
        Strategy::SteepestHillClimbing,
        Strategy::StochasticHillClimbing,
        Strategy::SimulatedAnnealing,
        Strategy::LocalBeam,
        Strategy::Genetic,
        Strategy::Backtracking,
        Strategy::Ac3,
        Strategy::GenerateAndTest,
        Strategy::AndOrGraph,
        Strategy::NoObservation,
        Strategy::PartialObservation,
        Strategy::QLearning,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Strategy::Bfs => "BFS",
            Strategy::Dfs => "DFS",
            Strategy::Ucs => "UCS",
            Strategy::Ids => "IDS",
            Strategy::Greedy => "Greedy",
            Strategy::AStar => "A*",
            Strategy::IdaStar => "IDA*",
            Strategy::SimpleHillClimbing => "Simple Hill Climbing",
            Strategy::SteepestHillClimbing => "Steepest-Hill Climbing",
            Strategy::StochasticHillClimbing => "Stochastic Hill Climbing",
            Strategy::SimulatedAnnealing => "Simulated Annealing",
            Strategy::LocalBeam => "Local Beam Search",
            Strategy::Genetic => "Genetic Algorithm",
            Strategy::Backtracking => "Backtracking",
            Strategy::Ac3 => "AC3",
            Strategy::GenerateAndTest => "Generate and Test",
            Strategy::AndOrGraph => "AND-OR Graph Search",
            Strategy::NoObservation => "Search with No Observation",
            Strategy::PartialObservation => "Search with Partial Observations",
            Strategy::QLearning => "Q-Learning",
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Strategy::Bfs | Strategy::Dfs | Strategy::Ucs | Strategy::Ids => Family::Uninformed,
            Strategy::Greedy | Strategy::AStar | Strategy::IdaStar => Family::Informed,
            Strategy::SimpleHillClimbing
            | Strategy::SteepestHillClimbing
            | Strategy::StochasticHillClimbing
            | Strategy::SimulatedAnnealing
            | Strategy::LocalBeam
            | Strategy::Genetic => Family::Local,
            Strategy::Backtracking | Strategy::Ac3 | Strategy::GenerateAndTest => Family::Constraint,
            Strategy::AndOrGraph | Strategy::NoObservation | Strategy::PartialObservation => Family::Belief,
            Strategy::QLearning => Family::Reinforcement,
        }
    }

    /// Whether nodes built for this strategy compute their heuristic up front.
    /// Blind breadth/depth-first searches never read it.
    pub fn uses_heuristic(&self) -> bool {
        !matches!(
            self,
            Strategy::Bfs | Strategy::Dfs | Strategy::Ucs | Strategy::Ids | Strategy::NoObservation
        )
    }

    /// Strategies whose solutions come with a per-step observation trace.
    pub fn produces_trace(&self) -> bool {
        matches!(self, Strategy::NoObservation | Strategy::PartialObservation)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

impl FromStr for Strategy {
    type Err = PuzzleError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let wanted = tag.trim();
        Strategy::ALL
            .into_iter()
            .find(|s| s.tag().eq_ignore_ascii_case(wanted) || format!("{:?}", s).eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PuzzleError::UnknownStrategy { tag: tag.to_string() })
    }
}

impl TryFrom<String> for Strategy {
    type Error = PuzzleError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse()
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        strategy.tag().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.tag().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!("astar".parse::<Strategy>().unwrap(), Strategy::AStar);
        assert_eq!(" a* ".parse::<Strategy>().unwrap(), Strategy::AStar);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert!(matches!(
            "Dijkstra".parse::<Strategy>(),
            Err(PuzzleError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn only_belief_searches_trace() {
        let tracing: Vec<Strategy> = Strategy::ALL.into_iter().filter(Strategy::produces_trace).collect();
        assert_eq!(tracing, vec![Strategy::NoObservation, Strategy::PartialObservation]);
        assert!(!Strategy::Bfs.uses_heuristic());
        assert!(Strategy::AStar.uses_heuristic());
    }

    #[test]
    fn every_family_has_a_member() {
        let families: Vec<Family> = Strategy::ALL.iter().map(Strategy::family).collect();
        for family in [
            Family::Uninformed,
            Family::Informed,
            Family::Local,
            Family::Constraint,
            Family::Belief,
            Family::Reinforcement,
        ] {
            assert!(families.contains(&family), "{:?}", family);
        }
        assert_eq!(Strategy::Ac3.family(), Family::Constraint);
        assert_eq!(Strategy::IdaStar.family(), Family::Informed);
    }
}
