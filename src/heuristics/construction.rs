//! Construction heuristics for precedence-valid initial tours.
//!
//! All heuristics work on the symmetric metric graph through a
//! [`TourProblem`] and return `None` when they cannot produce a tour in which
//! every pickup precedes its delivery. The orchestrator treats `None` as
//! "this heuristic failed" and tries the next one.

use std::collections::HashSet;

use ordered_float::OrderedFloat;

use crate::problem::TourProblem;
use crate::tour::Candidate;

pub trait ConstructionHeuristic {
    fn construct(&self, problem: &TourProblem<'_>) -> Option<Candidate>;
    fn name(&self) -> &'static str;
}

/// Precedence-aware Nearest Neighbor.
///
/// Extends the tour by repeatedly visiting the cheapest unvisited stop whose
/// precedence constraints allow a visit (a delivery only becomes eligible
/// once its pickup is in the tour). Tries the first few candidate starting
/// pickups and keeps the cheapest closed tour.
pub struct NearestNeighborHeuristic {
    /// How many candidate starting pickups to try
    pub max_starts: usize,
}

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic { max_starts: 3 }
    }

    pub fn with_starts(max_starts: usize) -> Self {
        NearestNeighborHeuristic { max_starts: max_starts.max(1) }
    }

    /// Greedily complete `core` over all stops, honoring eligibility.
    /// Fails when unvisited stops remain but none is eligible.
    fn extend(
        &self,
        problem: &TourProblem<'_>,
        stops: &[usize],
        mut core: Vec<usize>,
        mut visited: HashSet<usize>,
    ) -> Option<Vec<usize>> {
        let mut current = *core.last()?;
        while core.len() < stops.len() {
            let next = stops
                .iter()
                .copied()
                .filter(|n| !visited.contains(n))
                .filter(|&n| problem.may_visit(n, &visited))
                .min_by_key(|&n| OrderedFloat(problem.distance(current, n)))?;
            core.push(next);
            visited.insert(next);
            current = next;
        }
        Some(core)
    }
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, problem: &TourProblem<'_>) -> Option<Candidate> {
        if problem.pairs().is_empty() {
            return None;
        }
        let stops = problem.stops();

        let mut prefix = Vec::new();
        let mut visited = HashSet::new();
        if let Some(start) = problem.start() {
            prefix.push(start);
            visited.insert(start);
        }

        let starts: Vec<usize> = problem
            .pickups()
            .into_iter()
            .filter(|n| !visited.contains(n))
            .filter(|&n| problem.may_visit(n, &visited))
            .take(self.max_starts)
            .collect();

        let mut best: Option<Candidate> = None;
        for first in starts {
            let mut core = prefix.clone();
            let mut seen = visited.clone();
            core.push(first);
            seen.insert(first);

            if let Some(core) = self.extend(problem, &stops, core, seen) {
                if !problem.respects_precedence(&core) {
                    continue;
                }
                let candidate = Candidate::from_core(problem, core, self.name());
                if best.as_ref().map_or(true, |b| candidate.cost < b.cost) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn name(&self) -> &'static str {
        "NearestNeighbor"
    }
}

/// Clarke-Wright style Savings, adapted to pickup/delivery routes.
///
/// Starts with one pickup->delivery route per pair and greedily chains routes
/// in descending order of the savings obtained by skipping the detour through
/// the depot stop. The number of merges is bounded to avoid pathological
/// over-merging; the bound is a heuristic knob, not a correctness guarantee.
pub struct SavingsHeuristic {
    /// Maximum number of merges; defaults to half the initial route count
    pub merge_limit: Option<usize>,
}

struct RouteChain {
    routes: Vec<usize>,
    stops: Vec<usize>,
}

impl SavingsHeuristic {
    pub fn new() -> Self {
        SavingsHeuristic { merge_limit: None }
    }

    pub fn with_merge_limit(merge_limit: usize) -> Self {
        SavingsHeuristic { merge_limit: Some(merge_limit) }
    }
}

impl Default for SavingsHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for SavingsHeuristic {
    fn construct(&self, problem: &TourProblem<'_>) -> Option<Candidate> {
        let pairs = problem.pairs();
        if pairs.is_empty() {
            return None;
        }
        // Savings are scored through the start stop when one exists,
        // otherwise through the first pickup as a pseudo-depot.
        let depot = problem.start().unwrap_or(pairs[0].0);

        let initial: Vec<Vec<usize>> = pairs
            .iter()
            .map(|&(pickup, delivery)| {
                if pickup == delivery {
                    vec![pickup]
                } else {
                    vec![pickup, delivery]
                }
            })
            .collect();
        let m = initial.len();

        let mut savings: Vec<(usize, usize, f64)> = Vec::new();
        for a in 0..m {
            for b in 0..m {
                if a == b {
                    continue;
                }
                let tail = *initial[a].last().expect("route is non-empty");
                let head = initial[b][0];
                let s = problem.distance(tail, depot) + problem.distance(depot, head)
                    - problem.distance(tail, head);
                savings.push((a, b, s));
            }
        }
        savings.sort_by(|a, b| OrderedFloat(b.2).cmp(&OrderedFloat(a.2)));

        let mut chains: Vec<Option<RouteChain>> = initial
            .iter()
            .enumerate()
            .map(|(i, stops)| Some(RouteChain { routes: vec![i], stops: stops.clone() }))
            .collect();
        let mut chain_of: Vec<usize> = (0..m).collect();

        let max_merges = self.merge_limit.unwrap_or(m / 2);
        let mut merges = 0;

        for &(a, b, _) in &savings {
            if merges >= max_merges {
                break;
            }
            let ca = chain_of[a];
            let cb = chain_of[b];
            if ca == cb {
                continue;
            }
            // Only chain tail-to-head so each route keeps its internal order
            let tail_ok = chains[ca].as_ref().is_some_and(|c| *c.routes.last().unwrap() == a);
            let head_ok = chains[cb].as_ref().is_some_and(|c| c.routes[0] == b);
            if !tail_ok || !head_ok {
                continue;
            }

            let mut merged = chains[ca].as_ref().expect("tail chain is live").stops.clone();
            for &stop in &chains[cb].as_ref().expect("head chain is live").stops {
                if !merged.contains(&stop) {
                    merged.push(stop);
                }
            }
            if !problem.partial_precedence_ok(&merged) {
                continue;
            }

            let right = chains[cb].take().expect("head chain is live");
            for &route in &right.routes {
                chain_of[route] = ca;
            }
            let left = chains[ca].as_mut().expect("tail chain is live");
            left.stops = merged;
            left.routes.extend(right.routes);
            merges += 1;
        }

        let mut core = Vec::new();
        let mut seen = HashSet::new();
        if let Some(start) = problem.start() {
            core.push(start);
            seen.insert(start);
        }
        for chain in chains.into_iter().flatten() {
            for stop in chain.stops {
                if seen.insert(stop) {
                    core.push(stop);
                }
            }
        }

        if !problem.respects_precedence(&core) {
            return None;
        }
        Some(Candidate::from_core(problem, core, self.name()))
    }

    fn name(&self) -> &'static str {
        "Savings"
    }
}

/// Cheapest-insertion construction.
///
/// Seeds the tour with the pair closest to the depot, then inserts each
/// remaining pair's pickup and delivery at the position with the smallest
/// marginal cost increase among the precedence-valid positions. When no valid
/// position exists the pair's insertions are rolled back and both stops are
/// appended at the end instead.
pub struct InsertionHeuristic;

impl InsertionHeuristic {
    pub fn new() -> Self {
        InsertionHeuristic
    }

    /// Cheapest precedence-valid insertion of `node`, closed-tour semantics.
    /// Returns the index to insert at.
    fn best_insertion(
        &self,
        problem: &TourProblem<'_>,
        core: &[usize],
        node: usize,
    ) -> Option<usize> {
        let n = core.len();
        let mut best: Option<(usize, f64)> = None;
        for pos in 0..n {
            let prev = core[pos];
            let next = core[(pos + 1) % n];
            let marginal = problem.distance(prev, node) + problem.distance(node, next)
                - problem.distance(prev, next);

            let mut trial = core.to_vec();
            trial.insert(pos + 1, node);
            if !problem.partial_precedence_ok(&trial) {
                continue;
            }
            if best.map_or(true, |(_, cost)| marginal < cost) {
                best = Some((pos + 1, marginal));
            }
        }
        best.map(|(index, _)| index)
    }
}

impl Default for InsertionHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for InsertionHeuristic {
    fn construct(&self, problem: &TourProblem<'_>) -> Option<Candidate> {
        let pairs = problem.pairs();
        if pairs.is_empty() {
            return None;
        }

        let mut core = Vec::new();
        let mut seen = HashSet::new();
        if let Some(start) = problem.start() {
            core.push(start);
            seen.insert(start);
        }

        let seed = match problem.start() {
            Some(depot) => (0..pairs.len())
                .min_by_key(|&i| OrderedFloat(problem.distance(depot, pairs[i].0)))
                .expect("pairs is non-empty"),
            None => 0,
        };
        let (seed_pickup, seed_delivery) = pairs[seed];
        if seen.insert(seed_pickup) {
            core.push(seed_pickup);
        }
        if seen.insert(seed_delivery) {
            core.push(seed_delivery);
        }

        for (i, &(pickup, delivery)) in pairs.iter().enumerate() {
            if i == seed {
                continue;
            }
            let snapshot_core = core.clone();
            let snapshot_seen = seen.clone();

            let mut inserted = true;
            if seen.insert(pickup) {
                match self.best_insertion(problem, &core, pickup) {
                    Some(index) => core.insert(index, pickup),
                    None => inserted = false,
                }
            }
            if inserted && seen.insert(delivery) {
                match self.best_insertion(problem, &core, delivery) {
                    Some(index) => core.insert(index, delivery),
                    None => inserted = false,
                }
            }

            if !inserted {
                // Roll back and force-append: pickup before delivery at the
                // tail is always valid for this pair
                core = snapshot_core;
                seen = snapshot_seen;
                if seen.insert(pickup) {
                    core.push(pickup);
                }
                if seen.insert(delivery) {
                    core.push(delivery);
                }
            }
        }

        if !problem.respects_precedence(&core) {
            return None;
        }
        Some(Candidate::from_core(problem, core, self.name()))
    }

    fn name(&self) -> &'static str {
        "Insertion"
    }
}
