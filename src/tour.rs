//! Candidate tour representation.
//!
//! A candidate is the open "core" sequence of stops (metric indices, no
//! closing leg) plus its closed-tour cost and the name of the algorithm that
//! produced it. Closing appends the first stop so the return leg becomes
//! explicit.

use crate::problem::TourProblem;

/// A precedence-valid open tour over the metric graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Ordered distinct stops, not including the closing return leg
    pub core: Vec<usize>,
    /// Closed-tour cost (open cost plus return leg)
    pub cost: f64,
    /// Algorithm that produced this candidate
    pub algorithm: String,
}

impl Candidate {
    /// Evaluate `core` against `problem` and tag it with `algorithm`.
    pub fn from_core(problem: &TourProblem<'_>, core: Vec<usize>, algorithm: &str) -> Self {
        let cost = problem.closed_cost(&core);
        Candidate { core, cost, algorithm: algorithm.to_string() }
    }

    /// The closed form of this tour: the core with the first stop appended,
    /// when there is anything to close.
    pub fn closed(&self) -> Vec<usize> {
        let mut tour = self.core.clone();
        if tour.len() >= 2 {
            tour.push(tour[0]);
        }
        tour
    }

    /// Recompute the cost after the core was mutated in place.
    pub fn revalidate(&mut self, problem: &TourProblem<'_>) {
        self.cost = problem.closed_cost(&self.core);
    }
}
