//! Pickup-and-Delivery Tour Solver
//!
//! Computes closed courier tours over a road network: every pickup and its
//! delivery are visited exactly once, each pickup strictly before its
//! delivery, and the compact tour can be expanded back into a turn-by-turn
//! route over the network.
//!
//! # Pipeline
//!
//! - Road graph construction from intersection/segment records
//! - Bounded all-pairs shortest paths (one Dijkstra per requested stop)
//! - Symmetric metric graph over the largest mutually reachable stop set
//! - Construction heuristics (Nearest Neighbor, Savings, Insertion)
//! - Local search (2-opt, Or-opt, simulated annealing, multi-restart)
//! - Tour expansion with junction deduplication and cost accounting
//!
//! # Example
//!
//! ```
//! use pd_tour_solver::{expand, NodeRecord, RoadGraph, SegmentRecord, TspSolver};
//!
//! let nodes = vec![
//!     NodeRecord::new("depot", 48.85, 2.35),
//!     NodeRecord::new("bakery", 48.86, 2.34),
//!     NodeRecord::new("office", 48.87, 2.36),
//! ];
//! let mut segments = Vec::new();
//! for (a, b, length) in [
//!     ("depot", "bakery", 100.0),
//!     ("bakery", "office", 150.0),
//!     ("office", "depot", 200.0),
//! ] {
//!     segments.push(SegmentRecord::new(a, b, length, "rue"));
//!     segments.push(SegmentRecord::new(b, a, length, "rue"));
//! }
//! let graph = RoadGraph::build(&nodes, &segments);
//!
//! let pairs = vec![("bakery".to_string(), "office".to_string())];
//! let solution = TspSolver::new().solve(&graph, &pairs, Some("depot"));
//! assert!(!solution.is_empty());
//! assert_eq!(solution.tour.first(), solution.tour.last());
//!
//! let route = expand(&solution.tour, &solution.shortest_paths).unwrap();
//! assert!((route.cost - solution.cost).abs() < 1e-6);
//! ```

pub mod expand;
pub mod graph;
pub mod heuristics;
pub mod metric;
pub mod problem;
pub mod shortest_path;
pub mod solver;
pub mod tour;

pub use expand::{expand, ExpandError, ExpandedRoute};
pub use graph::{GraphCache, NodeId, NodeRecord, RoadGraph, SegmentRecord};
pub use metric::MetricGraph;
pub use shortest_path::{PathEntry, ShortestPathTable};
pub use solver::{Strategy, TourSolution, TspSolver};
