//! Road network representation.
//!
//! This module builds the directed weighted graph of intersections and street
//! segments that every other stage of the solver works against. Node ids are
//! normalized to a single canonical string type at ingestion; the algorithms
//! downstream only ever see interned indices.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Canonical node identifier, as handed over by the map-parsing collaborator.
pub type NodeId = String;

/// An intersection of the road network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node identifier
    pub id: NodeId,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl NodeRecord {
    pub fn new(id: impl Into<NodeId>, lat: f64, lon: f64) -> Self {
        NodeRecord { id: id.into(), lat, lon }
    }
}

/// A directed street segment between two intersections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// Origin intersection
    pub start_id: NodeId,
    /// Destination intersection
    pub end_id: NodeId,
    /// Physical length in meters (the edge weight)
    pub length_m: f64,
    /// Display name of the street
    pub street_name: String,
}

impl SegmentRecord {
    pub fn new(
        start_id: impl Into<NodeId>,
        end_id: impl Into<NodeId>,
        length_m: f64,
        street_name: impl Into<String>,
    ) -> Self {
        SegmentRecord {
            start_id: start_id.into(),
            end_id: end_id.into(),
            length_m,
            street_name: street_name.into(),
        }
    }
}

/// Directed weighted graph over road intersections.
///
/// Immutable once built. Duplicate directed edges between the same ordered
/// pair collapse to the minimum weight; segments referencing unknown nodes,
/// self-loops, and negative lengths are dropped rather than rejected.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    nodes: Vec<NodeRecord>,
    index: HashMap<NodeId, usize>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl RoadGraph {
    /// Build a graph from intersection and segment records.
    pub fn build(nodes: &[NodeRecord], segments: &[SegmentRecord]) -> Self {
        let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(nodes.len());
        let mut kept_nodes: Vec<NodeRecord> = Vec::with_capacity(nodes.len());

        for node in nodes {
            if index.contains_key(&node.id) {
                log::debug!("duplicate node record '{}' ignored", node.id);
                continue;
            }
            index.insert(node.id.clone(), kept_nodes.len());
            kept_nodes.push(node.clone());
        }

        // Minimum weight wins for parallel directed edges
        let mut edges: Vec<HashMap<usize, f64>> = vec![HashMap::new(); kept_nodes.len()];
        for segment in segments {
            let (from, to) = match (index.get(&segment.start_id), index.get(&segment.end_id)) {
                (Some(&f), Some(&t)) => (f, t),
                _ => {
                    log::debug!(
                        "segment '{}' ({} -> {}) references an unknown node, dropped",
                        segment.street_name,
                        segment.start_id,
                        segment.end_id
                    );
                    continue;
                }
            };
            if from == to {
                continue;
            }
            if segment.length_m < 0.0 {
                log::debug!(
                    "segment '{}' ({} -> {}) has negative length, dropped",
                    segment.street_name,
                    segment.start_id,
                    segment.end_id
                );
                continue;
            }
            edges[from]
                .entry(to)
                .and_modify(|w| *w = w.min(segment.length_m))
                .or_insert(segment.length_m);
        }

        let adjacency = edges
            .into_iter()
            .map(|out| {
                let mut out: Vec<(usize, f64)> = out.into_iter().collect();
                out.sort_by_key(|&(target, _)| target);
                out
            })
            .collect();

        RoadGraph { nodes: kept_nodes, index, adjacency }
    }

    /// Number of intersections.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the graph contains a node with this id.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Look up an intersection record by id.
    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Iterate over all node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub(crate) fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn id_of(&self, index: usize) -> &str {
        self.nodes[index].id.as_str()
    }

    pub(crate) fn neighbors(&self, index: usize) -> &[(usize, f64)] {
        &self.adjacency[index]
    }
}

/// Cache of built road graphs, keyed by a content hash of the source records.
///
/// Identical input data yields the same `Arc<RoadGraph>` without a rebuild;
/// changed data hashes to a new key and is rebuilt automatically. `clear`
/// is the explicit lever for callers that want to drop stale graphs. The
/// cached graphs are immutable, so shared references are safe to hand to
/// concurrent solvers; rebuilds go through `&mut self` and therefore
/// serialize at the caller.
#[derive(Debug, Default)]
pub struct GraphCache {
    entries: HashMap<u64, Arc<RoadGraph>>,
}

impl GraphCache {
    pub fn new() -> Self {
        GraphCache { entries: HashMap::new() }
    }

    /// Return the cached graph for these records, building it on a miss.
    pub fn get_or_build(&mut self, nodes: &[NodeRecord], segments: &[SegmentRecord]) -> Arc<RoadGraph> {
        let key = fingerprint(nodes, segments);
        self.entries
            .entry(key)
            .or_insert_with(|| Arc::new(RoadGraph::build(nodes, segments)))
            .clone()
    }

    /// Drop every cached graph.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached graphs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn fingerprint(nodes: &[NodeRecord], segments: &[SegmentRecord]) -> u64 {
    let mut hasher = DefaultHasher::new();
    nodes.len().hash(&mut hasher);
    for node in nodes {
        node.id.hash(&mut hasher);
        node.lat.to_bits().hash(&mut hasher);
        node.lon.to_bits().hash(&mut hasher);
    }
    segments.len().hash(&mut hasher);
    for segment in segments {
        segment.start_id.hash(&mut hasher);
        segment.end_id.hash(&mut hasher);
        segment.length_m.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
