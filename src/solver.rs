//! Solver orchestration.
//!
//! Wires the pipeline together: requested stops are validated against the
//! road graph, shortest paths are computed for the surviving stops, the
//! metric graph restricts the problem to what is actually solvable, and a
//! size-dependent strategy profile decides which construction heuristics and
//! local search effort to spend.

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::graph::{NodeId, RoadGraph};
use crate::heuristics::construction::{
    ConstructionHeuristic, InsertionHeuristic, NearestNeighborHeuristic,
};
use crate::heuristics::local_search::{OptimizerConfig, TourOptimizer};
use crate::metric::MetricGraph;
use crate::problem::TourProblem;
use crate::shortest_path::{self, ShortestPathTable};
use crate::tour::Candidate;

/// Size-dependent solver profile.
///
/// | profile | stops | construction | restarts | sweeps | annealing | Or-opt |
/// |---|---|---|---|---|---|---|
/// | Fast | <= 4 | NN | 1 | 200 | off | off |
/// | Balanced | 5-12 | NN + Insertion | 2 | 800 | on | on |
/// | Focused | > 12 | NN | 1 | 500 | off | off, 2-opt window 15 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Fast,
    Balanced,
    Focused,
}

impl Strategy {
    /// Pick the profile for `num_nodes = 2 x |pairs|`.
    pub fn for_size(num_nodes: usize) -> Self {
        if num_nodes <= 4 {
            Strategy::Fast
        } else if num_nodes <= 12 {
            Strategy::Balanced
        } else {
            Strategy::Focused
        }
    }

    fn construction_heuristics(&self) -> Vec<Box<dyn ConstructionHeuristic>> {
        match self {
            Strategy::Balanced => vec![
                Box::new(NearestNeighborHeuristic::new()),
                Box::new(InsertionHeuristic::new()),
            ],
            Strategy::Fast | Strategy::Focused => {
                vec![Box::new(NearestNeighborHeuristic::new())]
            }
        }
    }

    fn optimizer_config(&self, seed: u64) -> OptimizerConfig {
        match self {
            Strategy::Fast => OptimizerConfig {
                num_restarts: 1,
                iterations_per_restart: 200,
                use_annealing: false,
                use_or_opt: false,
                two_opt_window: None,
                seed,
                ..OptimizerConfig::default()
            },
            Strategy::Balanced => OptimizerConfig {
                num_restarts: 2,
                iterations_per_restart: 800,
                use_annealing: true,
                use_or_opt: true,
                two_opt_window: None,
                seed,
                ..OptimizerConfig::default()
            },
            Strategy::Focused => OptimizerConfig {
                num_restarts: 1,
                iterations_per_restart: 500,
                use_annealing: false,
                use_or_opt: false,
                two_opt_window: Some(15),
                seed,
                ..OptimizerConfig::default()
            },
        }
    }
}

/// Result of a solve.
///
/// An empty `tour` means "no solution possible" (nothing mutually reachable,
/// or every heuristic failed); it must not be read as a zero-cost success.
/// The shortest-path table computed during the solve is included so the tour
/// can be handed to [`crate::expand::expand`] without recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourSolution {
    /// Compact closed tour: `tour[0] == tour[last]` when two or more stops
    pub tour: Vec<NodeId>,
    /// Total metric cost of the closed tour
    pub cost: f64,
    /// Construction heuristic that produced the winning tour, `"none"` when empty
    pub algorithm: String,
    /// Wall-clock solve time in seconds
    pub computation_time: f64,
    /// Directed shortest paths over the requested stops
    pub shortest_paths: ShortestPathTable,
}

impl TourSolution {
    /// Whether the solve produced no usable tour.
    pub fn is_empty(&self) -> bool {
        self.tour.is_empty()
    }
}

/// Pickup-and-delivery TSP solver.
pub struct TspSolver {
    /// Seed for the local search RNG; fixed seeds reproduce runs
    pub seed: u64,
}

impl TspSolver {
    pub fn new() -> Self {
        TspSolver { seed: 42 }
    }

    pub fn with_seed(seed: u64) -> Self {
        TspSolver { seed }
    }

    /// Compute a closed tour visiting every pickup and delivery once, with
    /// every pickup before its delivery, optionally anchored at `start`.
    ///
    /// Stops missing from the road graph and pairs outside the mutually
    /// reachable component are dropped with a warning; the solver answers for
    /// the largest solvable sub-problem.
    pub fn solve(
        &self,
        graph: &RoadGraph,
        pairs: &[(NodeId, NodeId)],
        start: Option<&str>,
    ) -> TourSolution {
        let clock = Instant::now();

        // Unique requested stops that exist on the road network
        let mut seen: HashSet<&str> = HashSet::new();
        let mut interest: Vec<NodeId> = Vec::new();
        for (pickup, delivery) in pairs {
            for id in [pickup.as_str(), delivery.as_str()] {
                if !seen.insert(id) {
                    continue;
                }
                if graph.contains(id) {
                    interest.push(id.to_string());
                } else {
                    log::warn!("requested stop '{}' is not on the road network, dropped", id);
                }
            }
        }

        let start = start.filter(|id| {
            let known = graph.contains(id);
            if !known {
                log::warn!("start stop '{}' is not on the road network, ignored", id);
            }
            known
        });
        if let Some(id) = start {
            if seen.insert(id) {
                interest.push(id.to_string());
            }
        }

        if interest.is_empty() {
            return self.empty_solution(ShortestPathTable::default(), clock);
        }

        let table = shortest_path::compute(graph, &interest);
        let metric = MetricGraph::from_table(&table);
        if metric.len() < 2 {
            log::warn!("no two requested stops are mutually reachable, nothing to solve");
            return self.empty_solution(table, clock);
        }

        // Keep only the pairs fully inside the metric graph
        let mut index_pairs: Vec<(usize, usize)> = Vec::new();
        for (pickup, delivery) in pairs {
            match (metric.node_index(pickup), metric.node_index(delivery)) {
                (Some(p), Some(d)) => index_pairs.push((p, d)),
                _ => log::warn!(
                    "pair '{}' -> '{}' is outside the usable network, dropped",
                    pickup,
                    delivery
                ),
            }
        }
        if index_pairs.is_empty() {
            log::warn!("no pickup/delivery pair survived reachability filtering");
            return self.empty_solution(table, clock);
        }

        let start_index = start.and_then(|id| {
            let index = metric.node_index(id);
            if index.is_none() {
                log::warn!("start stop '{}' is unreachable from the deliveries, ignored", id);
            }
            index
        });

        let num_nodes = 2 * index_pairs.len();
        let strategy = Strategy::for_size(num_nodes);
        log::debug!("solving {} stops with the {:?} profile", num_nodes, strategy);

        let problem = TourProblem::new(&metric, index_pairs, start_index);

        let mut best: Option<Candidate> = None;
        for heuristic in strategy.construction_heuristics() {
            if let Some(candidate) = heuristic.construct(&problem) {
                if best.as_ref().map_or(true, |b| candidate.cost < b.cost) {
                    best = Some(candidate);
                }
            }
        }
        let Some(mut candidate) = best else {
            log::warn!("every construction heuristic failed, returning an empty result");
            return self.empty_solution(table, clock);
        };

        // Cores below three stops have nothing to optimize
        if candidate.core.len() >= 3 {
            let optimizer = TourOptimizer::new(strategy.optimizer_config(self.seed));
            let (core, cost) = optimizer.optimize(&problem, &candidate.core);
            candidate.core = core;
            candidate.cost = cost;
        }

        let tour = candidate
            .closed()
            .iter()
            .map(|&i| metric.node_id(i).to_string())
            .collect();

        TourSolution {
            tour,
            cost: candidate.cost,
            algorithm: candidate.algorithm,
            computation_time: clock.elapsed().as_secs_f64(),
            shortest_paths: table,
        }
    }

    fn empty_solution(&self, shortest_paths: ShortestPathTable, clock: Instant) -> TourSolution {
        TourSolution {
            tour: Vec::new(),
            cost: 0.0,
            algorithm: "none".to_string(),
            computation_time: clock.elapsed().as_secs_f64(),
            shortest_paths,
        }
    }
}

impl Default for TspSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;
    use crate::graph::{NodeRecord, SegmentRecord};

    /// Complete two-way network over the given ids, unit distances scaled by
    /// position so tours have distinguishable costs.
    fn two_way_graph(ids: &[&str]) -> RoadGraph {
        let nodes: Vec<NodeRecord> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| NodeRecord::new(*id, i as f64, 0.0))
            .collect();
        let mut segments = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            for (j, b) in ids.iter().enumerate() {
                if i < j {
                    let w = (j - i) as f64;
                    segments.push(SegmentRecord::new(*a, *b, w, "r"));
                    segments.push(SegmentRecord::new(*b, *a, w, "r"));
                }
            }
        }
        RoadGraph::build(&nodes, &segments)
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(NodeId, NodeId)> {
        list.iter().map(|(p, d)| (p.to_string(), d.to_string())).collect()
    }

    fn assert_precedence(solution: &TourSolution, pd: &[(&str, &str)]) {
        let stops = &solution.tour[..solution.tour.len() - 1];
        for (pickup, delivery) in pd {
            let p = stops.iter().position(|s| s.as_str() == *pickup).unwrap();
            let d = stops.iter().position(|s| s.as_str() == *delivery).unwrap();
            assert!(p < d, "pickup '{pickup}' not before delivery '{delivery}' in {stops:?}");
        }
    }

    #[test]
    fn test_solve_two_pairs() {
        let graph = two_way_graph(&["A", "B", "C", "D"]);
        let pd = [("A", "B"), ("C", "D")];
        let solution = TspSolver::new().solve(&graph, &pairs(&pd), None);

        assert_eq!(solution.tour.len(), 5);
        assert_eq!(solution.tour.first(), solution.tour.last());
        assert!(solution.cost > 0.0);
        assert_eq!(solution.algorithm, "NearestNeighbor");
        assert_precedence(&solution, &pd);
    }

    #[test]
    fn test_solve_unit_network_costs_four() {
        // Every stop one unit from every other: any valid tour costs 4
        let ids = ["A", "B", "C", "D"];
        let nodes: Vec<NodeRecord> =
            ids.iter().map(|id| NodeRecord::new(*id, 0.0, 0.0)).collect();
        let mut segments = Vec::new();
        for a in ids {
            for b in ids {
                if a != b {
                    segments.push(SegmentRecord::new(a, b, 1.0, "r"));
                }
            }
        }
        let graph = RoadGraph::build(&nodes, &segments);

        let pd = [("A", "B"), ("C", "D")];
        let solution = TspSolver::new().solve(&graph, &pairs(&pd), None);

        assert_eq!(solution.tour.len(), 5);
        assert_eq!(solution.tour.first(), solution.tour.last());
        assert!((solution.cost - 4.0).abs() < 1e-9);
        assert_precedence(&solution, &pd);
    }

    #[test]
    fn test_solve_with_start_stop() {
        let graph = two_way_graph(&["S", "A", "B", "C", "D"]);
        let pd = [("A", "B"), ("C", "D")];
        let solution = TspSolver::new().solve(&graph, &pairs(&pd), Some("S"));

        assert_eq!(solution.tour.len(), 6);
        assert_eq!(solution.tour[0], "S");
        assert_eq!(solution.tour.first(), solution.tour.last());
        assert_precedence(&solution, &pd);
    }

    #[test]
    fn test_cost_reconciles_with_expansion() {
        let graph = two_way_graph(&["A", "B", "C", "D", "E", "F"]);
        let pd = [("A", "D"), ("B", "E"), ("C", "F")];
        let solution = TspSolver::new().solve(&graph, &pairs(&pd), None);
        assert!(!solution.is_empty());

        let route = expand(&solution.tour, &solution.shortest_paths).unwrap();
        let relative = (route.cost - solution.cost).abs() / solution.cost.max(1.0);
        assert!(relative < 1e-6, "expanded {} vs compact {}", route.cost, solution.cost);
    }

    #[test]
    fn test_unknown_stop_dropped_gracefully() {
        let graph = two_way_graph(&["A", "B", "C", "D"]);
        // The second pair references a stop that is not on the network
        let pd = pairs(&[("A", "B"), ("C", "ghost")]);
        let solution = TspSolver::new().solve(&graph, &pd, None);

        assert_eq!(solution.tour, vec!["A", "B", "A"]);
        assert_precedence(&solution, &[("A", "B")]);
    }

    #[test]
    fn test_isolated_stop_excluded() {
        // "X" exists but has no segments at all
        let nodes = vec![
            NodeRecord::new("A", 0.0, 0.0),
            NodeRecord::new("B", 1.0, 0.0),
            NodeRecord::new("C", 2.0, 0.0),
            NodeRecord::new("D", 3.0, 0.0),
            NodeRecord::new("X", 9.0, 9.0),
        ];
        let mut segments = Vec::new();
        for (a, b, w) in [("A", "B", 1.0), ("B", "C", 1.0), ("C", "D", 1.0), ("A", "D", 3.0)] {
            segments.push(SegmentRecord::new(a, b, w, "r"));
            segments.push(SegmentRecord::new(b, a, w, "r"));
        }
        let graph = RoadGraph::build(&nodes, &segments);

        let pd = pairs(&[("A", "B"), ("C", "X"), ("C", "D")]);
        let solution = TspSolver::new().solve(&graph, &pd, None);

        assert!(!solution.is_empty());
        assert!(!solution.tour.iter().any(|s| s == "X"));
        assert_precedence(&solution, &[("A", "B"), ("C", "D")]);
    }

    #[test]
    fn test_missing_start_ignored() {
        let graph = two_way_graph(&["A", "B"]);
        let solution = TspSolver::new().solve(&graph, &pairs(&[("A", "B")]), Some("nowhere"));

        assert_eq!(solution.tour, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_empty_when_nothing_mutually_reachable() {
        // Single one-way street: A and B are not mutually reachable
        let nodes = vec![NodeRecord::new("A", 0.0, 0.0), NodeRecord::new("B", 1.0, 0.0)];
        let segments = vec![SegmentRecord::new("A", "B", 1.0, "sens unique")];
        let graph = RoadGraph::build(&nodes, &segments);

        let solution = TspSolver::new().solve(&graph, &pairs(&[("A", "B")]), None);
        assert!(solution.is_empty());
        assert_eq!(solution.cost, 0.0);
        assert_eq!(solution.algorithm, "none");
    }

    #[test]
    fn test_empty_when_no_pairs() {
        let graph = two_way_graph(&["A", "B"]);
        let solution = TspSolver::new().solve(&graph, &[], None);
        assert!(solution.is_empty());
    }

    #[test]
    fn test_strategy_thresholds() {
        assert_eq!(Strategy::for_size(2), Strategy::Fast);
        assert_eq!(Strategy::for_size(4), Strategy::Fast);
        assert_eq!(Strategy::for_size(5), Strategy::Balanced);
        assert_eq!(Strategy::for_size(12), Strategy::Balanced);
        assert_eq!(Strategy::for_size(13), Strategy::Focused);
    }

    #[test]
    fn test_solution_serializes() {
        let graph = two_way_graph(&["A", "B", "C", "D"]);
        let solution = TspSolver::new().solve(&graph, &pairs(&[("A", "B"), ("C", "D")]), None);

        let json = serde_json::to_string(&solution).unwrap();
        let back: TourSolution = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tour, solution.tour);
        assert_eq!(back.shortest_paths, solution.shortest_paths);
    }

    #[test]
    fn test_deterministic_runs() {
        let graph = two_way_graph(&["A", "B", "C", "D", "E", "F", "G", "H"]);
        let pd = pairs(&[("A", "E"), ("B", "F"), ("C", "G"), ("D", "H")]);

        let first = TspSolver::with_seed(11).solve(&graph, &pd, None);
        let second = TspSolver::with_seed(11).solve(&graph, &pd, None);
        assert_eq!(first.tour, second.tour);
        assert_eq!(first.cost, second.cost);
    }
}
