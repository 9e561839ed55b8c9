//! Local search refinement for candidate tours.
//!
//! Implements 2-opt (segment reversal) and Or-opt (segment relocation) over
//! the open core sequence, with optional simulated-annealing acceptance of
//! worsening moves and a multi-restart driver that perturbs the incumbent
//! between rounds. Every move is gated on the pickup-before-delivery
//! precedence check; the first stop of the core is pinned.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::problem::TourProblem;

/// Cost deltas within this tolerance count as "no change", so float noise
/// cannot make the search oscillate between equal tours.
pub(crate) const COST_EPSILON: f64 = 1e-9;

/// Tuning knobs for [`TourOptimizer`].
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Search rounds; rounds after the first start from a perturbed incumbent
    pub num_restarts: usize,
    /// Maximum 2-opt/Or-opt sweeps per round
    pub iterations_per_restart: usize,
    /// Accept worsening moves with probability `exp(-delta / temperature)`
    pub use_annealing: bool,
    /// Enable the Or-opt neighborhood
    pub use_or_opt: bool,
    /// Cap on the 2-opt reversal span; `None` scans the full neighborhood
    pub two_opt_window: Option<usize>,
    /// Starting annealing temperature
    pub initial_temperature: f64,
    /// Worsening moves are rejected once the temperature falls below this
    pub min_temperature: f64,
    /// Multiplicative cooling applied after every sweep
    pub cooling_rate: f64,
    /// Random adjacent swaps applied when perturbing between restarts
    pub perturbation_swaps: usize,
    /// RNG seed; identical seeds reproduce identical runs
    pub seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            num_restarts: 2,
            iterations_per_restart: 800,
            use_annealing: true,
            use_or_opt: true,
            two_opt_window: None,
            initial_temperature: 100.0,
            min_temperature: 1e-3,
            cooling_rate: 0.95,
            perturbation_swaps: 3,
            seed: 42,
        }
    }
}

/// Multi-restart 2-opt / Or-opt optimizer with simulated annealing.
pub struct TourOptimizer {
    pub config: OptimizerConfig,
}

impl TourOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        TourOptimizer { config }
    }

    /// Refine `core` and return the best precedence-valid core and its
    /// closed-tour cost. Cores with fewer than three stops have no usable
    /// neighborhood and are returned unchanged.
    pub fn optimize(&self, problem: &TourProblem<'_>, core: &[usize]) -> (Vec<usize>, f64) {
        let mut best = core.to_vec();
        let mut best_cost = problem.closed_cost(&best);
        if best.len() < 3 {
            return (best, best_cost);
        }

        let cfg = &self.config;
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);

        for restart in 0..cfg.num_restarts.max(1) {
            let mut current = best.clone();
            if restart > 0 {
                self.perturb(problem, &mut current, &mut rng);
            }
            let mut cost = problem.closed_cost(&current);
            let mut temperature = if cfg.use_annealing { cfg.initial_temperature } else { 0.0 };

            for _ in 0..cfg.iterations_per_restart {
                let mut moved =
                    self.two_opt_sweep(problem, &mut current, &mut cost, temperature, &mut rng);
                if cfg.use_or_opt {
                    moved |=
                        self.or_opt_sweep(problem, &mut current, &mut cost, temperature, &mut rng);
                }
                if cost < best_cost - COST_EPSILON {
                    best = current.clone();
                    best_cost = cost;
                }
                if !moved {
                    break;
                }
                temperature *= cfg.cooling_rate;
            }
        }

        (best, best_cost)
    }

    /// One 2-opt sweep. A strict improvement returns immediately so the next
    /// sweep re-scans from the top; annealing acceptances keep scanning.
    fn two_opt_sweep(
        &self,
        problem: &TourProblem<'_>,
        core: &mut Vec<usize>,
        cost: &mut f64,
        temperature: f64,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        let n = core.len();
        if n < 4 {
            return false;
        }
        let mut accepted_any = false;

        for i in 1..n - 2 {
            let upper = match self.config.two_opt_window {
                Some(window) => n.min(i + 1 + window),
                None => n,
            };
            for j in i + 2..=upper {
                let mut trial = core.clone();
                trial[i..j].reverse();
                if !problem.respects_precedence(&trial) {
                    continue;
                }
                let trial_cost = problem.closed_cost(&trial);
                let delta = trial_cost - *cost;
                if delta < -COST_EPSILON {
                    *core = trial;
                    *cost = trial_cost;
                    return true;
                }
                if self.accepts_worsening(delta, temperature, rng) {
                    *core = trial;
                    *cost = trial_cost;
                    accepted_any = true;
                }
            }
        }
        accepted_any
    }

    /// One Or-opt sweep: relocate segments of length 1 or 2 within a small
    /// window around their current position.
    fn or_opt_sweep(
        &self,
        problem: &TourProblem<'_>,
        core: &mut Vec<usize>,
        cost: &mut f64,
        temperature: f64,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        let n = core.len();
        if n < 3 {
            return false;
        }
        let mut accepted_any = false;

        for seg_len in 1..=2usize {
            if n <= seg_len + 1 {
                continue;
            }
            for seg_start in 1..=n - seg_len {
                let lo = seg_start.saturating_sub(4).max(1);
                let hi = (seg_start + 4).min(n - seg_len);
                for target in lo..=hi {
                    if target == seg_start {
                        continue;
                    }
                    let mut trial = core.clone();
                    let segment: Vec<usize> =
                        trial.drain(seg_start..seg_start + seg_len).collect();
                    for (offset, &stop) in segment.iter().enumerate() {
                        trial.insert(target + offset, stop);
                    }
                    if !problem.respects_precedence(&trial) {
                        continue;
                    }
                    let trial_cost = problem.closed_cost(&trial);
                    let delta = trial_cost - *cost;
                    if delta < -COST_EPSILON {
                        *core = trial;
                        *cost = trial_cost;
                        return true;
                    }
                    if self.accepts_worsening(delta, temperature, rng) {
                        *core = trial;
                        *cost = trial_cost;
                        accepted_any = true;
                    }
                }
            }
        }
        accepted_any
    }

    /// Metropolis rule for non-improving moves. Near-equal deltas are never
    /// accepted, only genuine worsenings while the temperature is high enough.
    fn accepts_worsening(&self, delta: f64, temperature: f64, rng: &mut ChaCha8Rng) -> bool {
        if !self.config.use_annealing
            || temperature <= self.config.min_temperature
            || delta <= COST_EPSILON
        {
            return false;
        }
        rng.gen::<f64>() < (-delta / temperature).exp()
    }

    /// Shake the incumbent with random adjacent swaps, reverting any swap
    /// that breaks precedence. The first stop stays pinned.
    fn perturb(&self, problem: &TourProblem<'_>, core: &mut Vec<usize>, rng: &mut ChaCha8Rng) {
        let n = core.len();
        if n < 3 {
            return;
        }
        for _ in 0..self.config.perturbation_swaps {
            let i = rng.gen_range(1..n - 1);
            core.swap(i, i + 1);
            if !problem.respects_precedence(core) {
                core.swap(i, i + 1);
            }
        }
    }
}
