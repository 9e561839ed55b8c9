//! Compact tour problem over the metric graph.
//!
//! Bundles everything the construction heuristics and the local search need:
//! the symmetric metric, the pickup/delivery pairs mapped to metric indices,
//! and the optional start stop. Sequences are always index sequences into the
//! metric graph; translation back to node ids happens in the solver.

use std::collections::{HashMap, HashSet};

use crate::metric::MetricGraph;

/// A pickup/delivery instance restricted to the metric graph.
#[derive(Debug)]
pub struct TourProblem<'a> {
    metric: &'a MetricGraph,
    pairs: Vec<(usize, usize)>,
    start: Option<usize>,
}

impl<'a> TourProblem<'a> {
    /// `pairs` and `start` are indices into `metric`.
    pub fn new(metric: &'a MetricGraph, pairs: Vec<(usize, usize)>, start: Option<usize>) -> Self {
        TourProblem { metric, pairs, start }
    }

    /// Symmetric travel cost between two stops.
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.metric.weight(i, j)
    }

    /// The pickup/delivery pairs, as metric indices.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// The fixed start stop, if one was requested.
    pub fn start(&self) -> Option<usize> {
        self.start
    }

    /// All distinct stops: start first when present, then the pair stops in
    /// input order. Stops shared between pairs appear once.
    pub fn stops(&self) -> Vec<usize> {
        let mut seen = HashSet::new();
        let mut stops = Vec::new();
        if let Some(start) = self.start {
            seen.insert(start);
            stops.push(start);
        }
        for &(pickup, delivery) in &self.pairs {
            if seen.insert(pickup) {
                stops.push(pickup);
            }
            if seen.insert(delivery) {
                stops.push(delivery);
            }
        }
        stops
    }

    /// Distinct pickup stops in pair order.
    pub fn pickups(&self) -> Vec<usize> {
        let mut seen = HashSet::new();
        self.pairs
            .iter()
            .map(|&(pickup, _)| pickup)
            .filter(|&p| seen.insert(p))
            .collect()
    }

    /// Full precedence check: every pair must have both endpoints in `seq`
    /// with the pickup strictly before the delivery.
    pub fn respects_precedence(&self, seq: &[usize]) -> bool {
        let position = positions(seq);
        self.pairs.iter().all(|&(pickup, delivery)| {
            match (position.get(&pickup), position.get(&delivery)) {
                (Some(&p), Some(&d)) => p < d,
                _ => false,
            }
        })
    }

    /// Partial precedence check for incomplete sequences: pairs with only one
    /// or no endpoint present are ignored; fully contained pairs must be
    /// ordered. Used while merging and inserting.
    pub fn partial_precedence_ok(&self, seq: &[usize]) -> bool {
        let position = positions(seq);
        self.pairs.iter().all(|&(pickup, delivery)| {
            match (position.get(&pickup), position.get(&delivery)) {
                (Some(&p), Some(&d)) => p < d,
                _ => true,
            }
        })
    }

    /// Whether `node` may be visited next: a delivery is only eligible once
    /// its pickup has been visited (a stop that is its own pickup counts).
    pub fn may_visit(&self, node: usize, visited: &HashSet<usize>) -> bool {
        self.pairs
            .iter()
            .filter(|&&(pickup, delivery)| delivery == node && pickup != node)
            .all(|&(pickup, _)| visited.contains(&pickup))
    }

    /// Cost of an open stop sequence (no return leg).
    pub fn open_cost(&self, seq: &[usize]) -> f64 {
        seq.windows(2).map(|w| self.distance(w[0], w[1])).sum()
    }

    /// Cost of the closed tour over `core`: the open cost plus the return leg
    /// from the last stop back to the first. Fewer than two stops cost 0.
    pub fn closed_cost(&self, core: &[usize]) -> f64 {
        if core.len() < 2 {
            return 0.0;
        }
        self.open_cost(core) + self.distance(core[core.len() - 1], core[0])
    }
}

fn positions(seq: &[usize]) -> HashMap<usize, usize> {
    let mut position = HashMap::with_capacity(seq.len());
    for (i, &node) in seq.iter().enumerate() {
        position.entry(node).or_insert(i);
    }
    position
}
