//! Bounded all-pairs shortest paths.
//!
//! Runs one Dijkstra per node of interest over the full road graph and keeps
//! only the targets that are themselves of interest. The road graph can be
//! orders of magnitude larger than the requested stop set, so the table is
//! O(k^2) entries for k stops, never O(V^2).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::graph::{NodeId, RoadGraph};

/// Outcome of a single directed shortest-path query.
///
/// Unreachable targets are data, not errors; they propagate into the metric
/// graph as excluded pairs instead of aborting the computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathEntry {
    /// A finite-cost path exists.
    Reachable {
        /// Full node sequence from source to target, inclusive
        path: Vec<NodeId>,
        /// Sum of edge weights along `path`
        cost: f64,
    },
    /// No path exists in this direction.
    Unreachable,
}

impl PathEntry {
    /// Cost of this entry, `+inf` when unreachable.
    pub fn cost(&self) -> f64 {
        match self {
            PathEntry::Reachable { cost, .. } => *cost,
            PathEntry::Unreachable => f64::INFINITY,
        }
    }

    /// Node sequence of this entry, `None` when unreachable.
    pub fn path(&self) -> Option<&[NodeId]> {
        match self {
            PathEntry::Reachable { path, .. } => Some(path),
            PathEntry::Unreachable => None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, PathEntry::Reachable { .. })
    }
}

/// Directed shortest-path table over a set of nodes of interest.
///
/// `rows[u][v]` holds the cheapest directed path from `u` to `v`. Every
/// source has a self entry with cost 0 and a singleton path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortestPathTable {
    rows: HashMap<NodeId, HashMap<NodeId, PathEntry>>,
}

impl ShortestPathTable {
    /// Look up the directed entry from `from` to `to`.
    pub fn entry(&self, from: &str, to: &str) -> Option<&PathEntry> {
        self.rows.get(from).and_then(|row| row.get(to))
    }

    /// Directed cost from `from` to `to`, `+inf` for missing or unreachable
    /// entries.
    pub fn cost(&self, from: &str, to: &str) -> f64 {
        self.entry(from, to).map_or(f64::INFINITY, PathEntry::cost)
    }

    /// Whether `id` is a source of this table.
    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// Iterate over the source node ids.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(NodeId::as_str)
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Compute the shortest-path table for `nodes_of_interest` over `graph`.
///
/// Ids absent from the graph are omitted from the table (the solver has
/// already warned about them); isolated nodes get `Unreachable` entries for
/// every target but themselves rather than failing the batch.
pub fn compute(graph: &RoadGraph, nodes_of_interest: &[NodeId]) -> ShortestPathTable {
    let mut interest: Vec<usize> = Vec::with_capacity(nodes_of_interest.len());
    for id in nodes_of_interest {
        if let Some(index) = graph.node_index(id) {
            if !interest.contains(&index) {
                interest.push(index);
            }
        }
    }

    let mut rows = HashMap::with_capacity(interest.len());
    for &source in &interest {
        let (dist, prev) = dijkstra(graph, source);

        let mut row = HashMap::with_capacity(interest.len());
        for &target in &interest {
            let entry = if target == source {
                PathEntry::Reachable { path: vec![graph.id_of(source).to_string()], cost: 0.0 }
            } else if dist[target].is_finite() {
                PathEntry::Reachable {
                    path: reconstruct(graph, &prev, source, target),
                    cost: dist[target],
                }
            } else {
                PathEntry::Unreachable
            };
            row.insert(graph.id_of(target).to_string(), entry);
        }
        rows.insert(graph.id_of(source).to_string(), row);
    }

    ShortestPathTable { rows }
}

/// Single-source Dijkstra over the full graph. Returns per-node distances
/// (`+inf` when unreached) and predecessor indices (`usize::MAX` sentinel).
fn dijkstra(graph: &RoadGraph, source: usize) -> (Vec<f64>, Vec<usize>) {
    let n = graph.len();
    let mut dist = vec![f64::INFINITY; n];
    let mut prev = vec![usize::MAX; n];
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, usize)>> = BinaryHeap::new();

    dist[source] = 0.0;
    heap.push(Reverse((OrderedFloat(0.0), source)));

    while let Some(Reverse((OrderedFloat(cost), node))) = heap.pop() {
        if cost > dist[node] {
            continue; // stale heap entry
        }
        for &(next, weight) in graph.neighbors(node) {
            let candidate = cost + weight;
            if candidate < dist[next] {
                dist[next] = candidate;
                prev[next] = node;
                heap.push(Reverse((OrderedFloat(candidate), next)));
            }
        }
    }

    (dist, prev)
}

fn reconstruct(graph: &RoadGraph, prev: &[usize], source: usize, target: usize) -> Vec<NodeId> {
    let mut indices = vec![target];
    let mut current = target;
    while current != source {
        current = prev[current];
        indices.push(current);
    }
    indices.reverse();
    indices.into_iter().map(|i| graph.id_of(i).to_string()).collect()
}
