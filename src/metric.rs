//! Symmetric complete metric graph over the usable stops.
//!
//! The shortest-path table is directed and possibly incomplete (one-way
//! streets, disconnected stops). The metric graph restricts it to the largest
//! set of mutually reachable stops and symmetrizes the costs, so the tour
//! heuristics can work on a complete undirected instance. Stops outside that
//! set are dropped, not reported as failures.

use std::collections::{HashMap, VecDeque};

use crate::graph::NodeId;
use crate::shortest_path::ShortestPathTable;

/// Complete undirected weighted graph over a subset of the requested stops.
///
/// `weight(u, v) = min(cost(u, v), cost(v, u))` over the directed
/// shortest-path costs. Empty when fewer than two stops are mutually
/// reachable.
#[derive(Debug, Clone, Default)]
pub struct MetricGraph {
    nodes: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    weights: Vec<Vec<f64>>,
}

impl MetricGraph {
    /// Build the metric graph from a directed shortest-path table.
    ///
    /// Keeps exactly the largest connected component of the mutual
    /// reachability relation (finite cost in both directions). Ties between
    /// equally large components break toward the one found first in sorted
    /// node order, so repeated builds agree.
    pub fn from_table(table: &ShortestPathTable) -> Self {
        let mut all: Vec<NodeId> = table.sources().map(str::to_string).collect();
        all.sort();
        let n = all.len();
        if n < 2 {
            return MetricGraph::default();
        }

        let mutual = |u: &str, v: &str| {
            table.cost(u, v).is_finite() && table.cost(v, u).is_finite()
        };

        // Connected components of the mutual-reachability adjacency
        let mut component = vec![usize::MAX; n];
        let mut components: Vec<Vec<usize>> = Vec::new();
        for start in 0..n {
            if component[start] != usize::MAX {
                continue;
            }
            let id = components.len();
            let mut members = vec![start];
            component[start] = id;
            let mut queue = VecDeque::from([start]);
            while let Some(u) = queue.pop_front() {
                for v in 0..n {
                    if component[v] == usize::MAX && mutual(&all[u], &all[v]) {
                        component[v] = id;
                        members.push(v);
                        queue.push_back(v);
                    }
                }
            }
            components.push(members);
        }

        // max_by_key would keep the last maximum; keep the first instead
        let mut largest = &components[0];
        for members in &components[1..] {
            if members.len() > largest.len() {
                largest = members;
            }
        }
        if largest.len() < 2 {
            return MetricGraph::default();
        }

        let nodes: Vec<NodeId> = largest.iter().map(|&i| all[i].clone()).collect();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let k = nodes.len();
        let mut weights = vec![vec![0.0; k]; k];
        for i in 0..k {
            for j in i + 1..k {
                let w = table.cost(&nodes[i], &nodes[j]).min(table.cost(&nodes[j], &nodes[i]));
                weights[i][j] = w;
                weights[j][i] = w;
            }
        }

        MetricGraph { nodes, index, weights }
    }

    /// Number of stops in the metric graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether this stop survived the mutual-reachability restriction.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The surviving stops, in deterministic order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Symmetric weight between two stops by id.
    pub fn weight_between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.node_index(a)?;
        let j = self.node_index(b)?;
        Some(self.weight(i, j))
    }

    pub(crate) fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn node_id(&self, index: usize) -> &str {
        self.nodes[index].as_str()
    }

    #[inline]
    pub(crate) fn weight(&self, i: usize, j: usize) -> f64 {
        self.weights[i][j]
    }

    /// Test constructor bypassing the table; weights must be symmetric.
    #[cfg(test)]
    pub(crate) fn from_parts(nodes: Vec<NodeId>, weights: Vec<Vec<f64>>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        MetricGraph { nodes, index, weights }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeRecord, RoadGraph, SegmentRecord};
    use crate::shortest_path;

    fn ids(list: &[&str]) -> Vec<NodeId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_asymmetric_costs_take_minimum() {
        let nodes = vec![NodeRecord::new("A", 0.0, 0.0), NodeRecord::new("B", 0.0, 1.0)];
        let segments = vec![
            SegmentRecord::new("A", "B", 15.0, "Montee"),
            SegmentRecord::new("B", "A", 10.0, "Descente"),
        ];
        let graph = RoadGraph::build(&nodes, &segments);
        let table = shortest_path::compute(&graph, &ids(&["A", "B"]));
        let metric = MetricGraph::from_table(&table);

        assert_eq!(metric.weight_between("A", "B"), Some(10.0));
        assert_eq!(metric.weight_between("B", "A"), Some(10.0));
    }

    #[test]
    fn test_symmetry() {
        let nodes = vec![
            NodeRecord::new("A", 0.0, 0.0),
            NodeRecord::new("B", 0.0, 1.0),
            NodeRecord::new("C", 1.0, 1.0),
        ];
        let segments = vec![
            SegmentRecord::new("A", "B", 3.0, "r1"),
            SegmentRecord::new("B", "A", 3.0, "r1"),
            SegmentRecord::new("B", "C", 4.0, "r2"),
            SegmentRecord::new("C", "B", 4.0, "r2"),
            SegmentRecord::new("A", "C", 9.0, "r3"),
            SegmentRecord::new("C", "A", 9.0, "r3"),
        ];
        let graph = RoadGraph::build(&nodes, &segments);
        let table = shortest_path::compute(&graph, &ids(&["A", "B", "C"]));
        let metric = MetricGraph::from_table(&table);

        assert_eq!(metric.len(), 3);
        for a in metric.node_ids() {
            for b in metric.node_ids() {
                assert_eq!(metric.weight_between(a, b), metric.weight_between(b, a));
            }
        }
        // The detour through B beats the direct segment
        assert_eq!(metric.weight_between("A", "C"), Some(7.0));
    }

    #[test]
    fn test_unreachable_outlier_excluded() {
        let nodes = vec![
            NodeRecord::new("A", 0.0, 0.0),
            NodeRecord::new("B", 0.0, 1.0),
            NodeRecord::new("X", 9.0, 9.0),
        ];
        let segments = vec![
            SegmentRecord::new("A", "B", 5.0, "r"),
            SegmentRecord::new("B", "A", 5.0, "r"),
        ];
        let graph = RoadGraph::build(&nodes, &segments);
        let table = shortest_path::compute(&graph, &ids(&["A", "B", "X"]));
        let metric = MetricGraph::from_table(&table);

        assert_eq!(metric.len(), 2);
        assert!(metric.contains("A"));
        assert!(metric.contains("B"));
        assert!(!metric.contains("X"));
    }

    #[test]
    fn test_one_way_pair_excluded() {
        // A reaches B but not back: not mutually reachable, no usable metric
        let nodes = vec![NodeRecord::new("A", 0.0, 0.0), NodeRecord::new("B", 0.0, 1.0)];
        let segments = vec![SegmentRecord::new("A", "B", 5.0, "sens unique")];
        let graph = RoadGraph::build(&nodes, &segments);
        let table = shortest_path::compute(&graph, &ids(&["A", "B"]));
        let metric = MetricGraph::from_table(&table);

        assert!(metric.is_empty());
    }

    #[test]
    fn test_largest_component_wins() {
        // Two mutually reachable islands: {A, B} and {C, D, E}
        let nodes = vec![
            NodeRecord::new("A", 0.0, 0.0),
            NodeRecord::new("B", 0.0, 1.0),
            NodeRecord::new("C", 5.0, 5.0),
            NodeRecord::new("D", 5.0, 6.0),
            NodeRecord::new("E", 6.0, 6.0),
        ];
        let mut segments = Vec::new();
        for (u, v, w) in [
            ("A", "B", 1.0),
            ("C", "D", 1.0),
            ("D", "E", 1.0),
        ] {
            segments.push(SegmentRecord::new(u, v, w, "r"));
            segments.push(SegmentRecord::new(v, u, w, "r"));
        }
        let graph = RoadGraph::build(&nodes, &segments);
        let table = shortest_path::compute(&graph, &ids(&["A", "B", "C", "D", "E"]));
        let metric = MetricGraph::from_table(&table);

        assert_eq!(metric.len(), 3);
        assert!(metric.contains("C") && metric.contains("D") && metric.contains("E"));
        assert!(!metric.contains("A"));
    }
}
