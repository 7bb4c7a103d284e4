#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::OnceLock;

    use rustc_hash::FxHashMap;

    use crate::board::{Board, Direction};
    use crate::config::SearchConfig;
    use crate::node::Provenance;
    use crate::session::Session;
    use crate::solvability::is_solvable;
    use crate::strategy::Strategy;
    use crate::traits::puzzle::Heuristic;

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    /// True distance to the solved board for every board that can reach it.
    fn distances() -> &'static FxHashMap<Board, u32> {
        static TABLE: OnceLock<FxHashMap<Board, u32>> = OnceLock::new();
        TABLE.get_or_init(|| {
            let goal = Board::solved();
            let mut table = FxHashMap::default();
            table.insert(goal, 0);
            let mut queue = VecDeque::from([goal]);
            while let Some(current) = queue.pop_front() {
                let d = table[&current];
                for next in current.possible_moves() {
                    if !table.contains_key(&next) {
                        table.insert(next, d + 1);
                        queue.push_back(next);
                    }
                }
            }
            table
        })
    }

    fn swap_tiles(board: &Board) -> Board {
        let mut cells = *board.cells();
        let (a, b) = match board.blank_idx() {
            0 | 1 => (2, 3),
            _ => (0, 1),
        };
        cells.swap(a, b);
        Board::new(cells).unwrap()
    }

    #[test]
    fn reachable_half_matches_inversion_parity() {
        let table = distances();
        assert_eq!(table.len(), 181_440);
        let goal = Board::solved();
        for board in table.keys().step_by(97) {
            assert!(is_solvable(board, &goal));
            let swapped = swap_tiles(board);
            assert!(!table.contains_key(&swapped));
            assert!(!is_solvable(&swapped, &goal));
        }
    }

    #[test]
    fn manhattan_distance_is_admissible() {
        let goal = Board::solved();
        for (board, &distance) in distances() {
            let h = board.heuristic(&goal);
            assert!(h <= distance, "{:?}: h={} > {}", board.cells(), h, distance);
            assert_eq!(h == 0, *board == goal);
        }
    }

    #[test]
    fn optimal_strategies_match_true_distance() {
        let table = distances();
        let fixtures = ["123456708", "413726058", "123740865", "724506831", "867254301"];
        let mut session = Session::seeded(SearchConfig::default(), 1);

        for fixture in fixtures {
            let start = board(fixture);
            let expected = table[&start];
            for strategy in [Strategy::Bfs, Strategy::Ucs, Strategy::AStar] {
                let solution = session.solve(&start, &Board::solved(), strategy);
                assert_eq!(solution.moves(), Some(expected), "{} on {}", strategy, fixture);
            }
        }
    }

    #[test]
    fn every_strategy_is_idempotent_on_the_goal() {
        let goal = board("123456780");
        let mut session = Session::seeded(SearchConfig::default(), 2);
        for strategy in Strategy::ALL {
            let solution = session.solve(&goal, &goal, strategy);
            let terminal = solution.terminal.as_ref().unwrap();
            assert_eq!(terminal.moves(), 0, "{}", strategy);
            assert_eq!(terminal.provenance(), Provenance::Exact);
            assert_eq!(terminal.boards(), vec![goal]);
        }
    }

    #[test]
    fn one_swap_apart_with_bfs() {
        let mut session = Session::default();
        let solution = session
            .solve_grids(
                vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 0, 8]],
                vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 0]],
                Strategy::Bfs,
            )
            .unwrap();
        let terminal = solution.terminal.unwrap();
        assert_eq!(terminal.moves(), 1);
        assert_eq!(terminal.directions(), vec![Direction::Right]);
    }

    #[test]
    fn textbook_instance_of_twenty_moves() {
        let start = board("724506831");
        let goal = Board::solved();
        let mut session = Session::seeded(SearchConfig::default(), 3);

        let a_star = session.solve(&start, &goal, Strategy::AStar);
        assert_eq!(a_star.moves(), Some(20));

        let greedy = session.solve(&start, &goal, Strategy::Greedy);
        assert!(greedy.is_solved());
        assert!(greedy.moves().unwrap() >= 20);
    }

    #[test]
    fn unsolvable_pair_has_no_solution_for_any_strategy() {
        let start = board("123456870");
        let mut session = Session::seeded(SearchConfig::default(), 4);
        for strategy in Strategy::ALL {
            let solution = session.solve(&start, &Board::solved(), strategy);
            assert!(solution.terminal.is_none(), "{}", strategy);
            assert!(solution.trace.is_empty());
            assert!(solution.elapsed_secs() >= 0.0);
        }
    }

    #[test]
    fn every_returned_path_is_a_chain_of_single_slides() {
        let start = board("413726058");
        let mut session = Session::seeded(SearchConfig::default(), 5);

        for strategy in Strategy::ALL {
            let solution = session.solve(&start, &Board::solved(), strategy);
            let Some(terminal) = &solution.terminal else {
                continue;
            };
            let path = solution.path();
            assert_eq!(path[0].board, start, "{}", strategy);
            for (i, pair) in path.windows(2).enumerate() {
                assert!(pair[0].board.is_adjacent(&pair[1].board), "{} step {}", strategy, i);
                assert_eq!(pair[1].moves, pair[0].moves + 1);
                let tile = pair[0].board.moved_tile(&pair[1].board).unwrap();
                assert_eq!(pair[1].board.position_of(0), pair[0].board.position_of(tile));
            }
            if terminal.provenance() != Provenance::BestEffort {
                assert!(terminal.is_goal(), "{}", strategy);
                assert!(terminal.moves() >= 6, "{}", strategy);
            }
            assert_eq!(solution.trace.is_empty(), !strategy.produces_trace());
        }
    }

    #[test]
    fn same_seed_gives_same_answer_for_every_randomized_strategy() {
        let start = board("413726058");
        let mut config = SearchConfig::default();
        config.q_learning.episodes = 500;

        let randomized = [
            Strategy::SimulatedAnnealing,
            Strategy::StochasticHillClimbing,
            Strategy::GenerateAndTest,
            Strategy::QLearning,
            Strategy::Genetic,
        ];
        for strategy in randomized {
            let run = |seed| {
                let mut session = Session::seeded(config.clone(), seed);
                session
                    .solve(&start, &Board::solved(), strategy)
                    .terminal
                    .map(|t| (t.moves_str(), t.provenance()))
            };
            assert_eq!(run(42), run(42), "{}", strategy);
            assert_eq!(run(7), run(7), "{}", strategy);
        }
    }
}
