//! Runs several strategies on the same pair side by side.

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use log::debug;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::board::Board;
use crate::config::SearchConfig;
use crate::node::Provenance;
use crate::session::{Session, Solution};
use crate::strategy::{Family, Strategy};

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Shared by every report of one comparison.
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub strategy: Strategy,
    pub family: Family,
    pub solved: bool,
    pub moves: Option<u32>,
    pub provenance: Option<Provenance>,
    pub elapsed_secs: f64,
    pub directions: Option<String>,
    pub trace_len: usize,
}

impl Report {
    fn new(run_id: Uuid, timestamp: DateTime<Utc>, strategy: Strategy, solution: &Solution) -> Self {
        Self {
            run_id,
            timestamp,
            strategy,
            family: strategy.family(),
            solved: solution.is_solved(),
            moves: solution.moves(),
            provenance: solution.provenance(),
            elapsed_secs: solution.elapsed_secs(),
            directions: solution.terminal.as_ref().map(|t| t.moves_str()),
            trace_len: solution.trace.len(),
        }
    }
}

/// Solves `start -> goal` with every strategy in parallel, each in its own
/// session seeded with `seed`. Reports come back fastest first.
pub fn compare(
    start: &Board,
    goal: &Board,
    strategies: &[Strategy],
    config: &SearchConfig,
    seed: u64,
    progress: Option<&ProgressBar>,
) -> Vec<Report> {
    let run_id = Uuid::new_v4();
    let timestamp = Utc::now();
    debug!("comparison {} over {} strategies", run_id, strategies.len());

    let mut reports: Vec<Report> = strategies
        .par_iter()
        .map(|&strategy| {
            let mut session = Session::seeded(config.clone(), seed);
            let solution = session.solve(start, goal, strategy);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            Report::new(run_id, timestamp, strategy, &solution)
        })
        .collect();

    reports.sort_by_key(|report| OrderedFloat(report.elapsed_secs));
    reports
}

/// Groups reports by strategy family, families in declaration order. The
/// order within a family is kept.
pub fn by_family(reports: &[Report]) -> Vec<(Family, Vec<&Report>)> {
    let mut groups: Vec<(Family, Vec<&Report>)> = Vec::new();
    for report in reports {
        match groups.iter_mut().find(|(family, _)| *family == report.family) {
            Some((_, members)) => members.push(report),
            None => groups.push((report.family, vec![report])),
        }
    }
    groups.sort_by_key(|(family, _)| *family);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_share_a_run_and_are_sorted() {
        let start: Board = "123405786".parse().unwrap();
        let strategies = [Strategy::Bfs, Strategy::AStar, Strategy::Ucs, Strategy::LocalBeam];
        let reports = compare(&start, &Board::solved(), &strategies, &SearchConfig::default(), 7, None);

        assert_eq!(reports.len(), strategies.len());
        assert!(reports.iter().all(|r| r.run_id == reports[0].run_id));
        assert!(reports.windows(2).all(|w| w[0].elapsed_secs <= w[1].elapsed_secs));
        for report in &reports {
            assert!(report.solved);
            assert_eq!(report.moves, Some(2));
            assert_eq!(report.directions.as_deref(), Some("RD"));
        }
    }

    #[test]
    fn report_serializes_with_tag() {
        let start: Board = "123456708".parse().unwrap();
        let reports = compare(&start, &Board::solved(), &[Strategy::AStar], &SearchConfig::default(), 1, None);
        let json = serde_json::to_value(&reports[0]).unwrap();
        assert_eq!(json["strategy"], "A*");
        assert_eq!(json["provenance"], "Exact");
        assert_eq!(json["moves"], 1);
        assert_eq!(json["family"], "Informed");
    }

    #[test]
    fn grouping_follows_family_order_and_keeps_speed_order() {
        let start: Board = "123405786".parse().unwrap();
        let strategies = [Strategy::LocalBeam, Strategy::AStar, Strategy::Bfs, Strategy::Ucs, Strategy::Greedy];
        let reports = compare(&start, &Board::solved(), &strategies, &SearchConfig::default(), 3, None);
        let groups = by_family(&reports);

        let families: Vec<Family> = groups.iter().map(|(family, _)| *family).collect();
        assert_eq!(families, vec![Family::Uninformed, Family::Informed, Family::Local]);
        assert_eq!(groups.iter().map(|(_, members)| members.len()).sum::<usize>(), strategies.len());
        for (family, members) in &groups {
            assert!(members.iter().all(|r| r.family == *family));
            assert!(members.windows(2).all(|w| w[0].elapsed_secs <= w[1].elapsed_secs));
        }
    }
}
