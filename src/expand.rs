//! Compact tour expansion.
//!
//! Turns a compact tour (important stops only) into the full sequence of road
//! network nodes by splicing the shortest path of every leg, deduplicating
//! the shared junction at each splice point and accumulating the leg costs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;
use crate::shortest_path::{PathEntry, ShortestPathTable};

/// A fully expanded route over the road network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedRoute {
    /// Every road node traversed, in order
    pub route: Vec<NodeId>,
    /// Sum of the per-leg shortest-path costs
    pub cost: f64,
}

/// Expansion failure: the compact tour references a leg the shortest-path
/// table cannot serve.
///
/// A compact tour produced by the solver never contains unreachable legs, so
/// hitting this means the tour and the table do not belong together. It is
/// raised loudly instead of truncating the route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    /// The table has no usable path from `from` to `to`.
    NoShortestPath { from: NodeId, to: NodeId },
}

impl fmt::Display for ExpandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpandError::NoShortestPath { from, to } => {
                write!(f, "no shortest path from '{from}' to '{to}'")
            }
        }
    }
}

impl std::error::Error for ExpandError {}

/// Expand `tour` into a full road-level route using `table`.
///
/// A tour of fewer than two stops expands to an empty route of zero cost.
pub fn expand(tour: &[NodeId], table: &ShortestPathTable) -> Result<ExpandedRoute, ExpandError> {
    if tour.len() < 2 {
        return Ok(ExpandedRoute { route: Vec::new(), cost: 0.0 });
    }

    let mut route: Vec<NodeId> = Vec::new();
    let mut cost = 0.0;

    for leg in tour.windows(2) {
        let (from, to) = (&leg[0], &leg[1]);
        let (path, leg_cost) = match table.entry(from, to) {
            Some(PathEntry::Reachable { path, cost }) => (path, *cost),
            Some(PathEntry::Unreachable) | None => {
                return Err(ExpandError::NoShortestPath { from: from.clone(), to: to.clone() });
            }
        };

        for (i, node) in path.iter().enumerate() {
            // The leg starts where the previous one ended
            if i == 0 && route.last() == Some(node) {
                continue;
            }
            route.push(node.clone());
        }
        cost += leg_cost;
    }

    Ok(ExpandedRoute { route, cost })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeRecord, RoadGraph, SegmentRecord};
    use crate::shortest_path;

    fn ids(list: &[&str]) -> Vec<NodeId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Two-way line A - X - B - Y - C; only A, B, C are stops of interest.
    fn line_table() -> ShortestPathTable {
        let nodes = vec![
            NodeRecord::new("A", 0.0, 0.0),
            NodeRecord::new("X", 0.0, 1.0),
            NodeRecord::new("B", 0.0, 2.0),
            NodeRecord::new("Y", 0.0, 3.0),
            NodeRecord::new("C", 0.0, 4.0),
        ];
        let mut segments = Vec::new();
        for (u, v) in [("A", "X"), ("X", "B"), ("B", "Y"), ("Y", "C")] {
            segments.push(SegmentRecord::new(u, v, 1.0, "r"));
            segments.push(SegmentRecord::new(v, u, 1.0, "r"));
        }
        let graph = RoadGraph::build(&nodes, &segments);
        shortest_path::compute(&graph, &ids(&["A", "B", "C"]))
    }

    #[test]
    fn test_junctions_deduplicated() {
        let table = line_table();
        let expanded = expand(&ids(&["A", "B", "C"]), &table).unwrap();

        assert_eq!(expanded.route, ids(&["A", "X", "B", "Y", "C"]));
        assert!((expanded.cost - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_closed_tour_expansion() {
        let table = line_table();
        let expanded = expand(&ids(&["A", "C", "A"]), &table).unwrap();

        assert_eq!(expanded.route, ids(&["A", "X", "B", "Y", "C", "Y", "B", "X", "A"]));
        assert!((expanded.cost - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_tour_is_empty() {
        let table = line_table();
        assert_eq!(
            expand(&ids(&["A"]), &table).unwrap(),
            ExpandedRoute { route: Vec::new(), cost: 0.0 }
        );
        assert_eq!(
            expand(&[], &table).unwrap(),
            ExpandedRoute { route: Vec::new(), cost: 0.0 }
        );
    }

    #[test]
    fn test_unreachable_leg_raises() {
        // One-way street: B can never get back to A
        let nodes = vec![NodeRecord::new("A", 0.0, 0.0), NodeRecord::new("B", 0.0, 1.0)];
        let segments = vec![SegmentRecord::new("A", "B", 1.0, "sens unique")];
        let graph = RoadGraph::build(&nodes, &segments);
        let table = shortest_path::compute(&graph, &ids(&["A", "B"]));

        let err = expand(&ids(&["B", "A"]), &table).unwrap_err();
        assert_eq!(
            err,
            ExpandError::NoShortestPath { from: "B".to_string(), to: "A".to_string() }
        );
        assert_eq!(err.to_string(), "no shortest path from 'B' to 'A'");
    }

    #[test]
    fn test_missing_entry_raises() {
        let table = line_table();
        // "Z" was never a node of interest, so the table has no row for it
        let err = expand(&ids(&["A", "Z"]), &table).unwrap_err();
        assert!(matches!(err, ExpandError::NoShortestPath { .. }));
    }
}
