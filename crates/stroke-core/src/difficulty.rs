//! Difficulty sampling.
//!
//! Runs the solver repeatedly with different random tie-breaking, stopping each
//! trial at its first solution, and summarizes how much searching that took.
//! Used to label levels offline and to rank daily candidates; it plays no part in
//! solver correctness.

use crate::level::Level;
use crate::rng::Prng;
use crate::solver::{SolveOptions, Solver};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Trial configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub trials: usize,
    /// Deadline per trial
    pub trial_budget: Duration,
    /// Node cap per trial; with a generous deadline this makes results reproducible
    pub node_limit: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            trials: 16,
            trial_budget: Duration::from_millis(500),
            node_limit: None,
        }
    }
}

impl SamplerConfig {
    /// Few node-limited trials, for ranking candidates inside a batch job
    pub fn deterministic() -> Self {
        Self {
            trials: 6,
            trial_budget: Duration::from_secs(30),
            node_limit: Some(60_000),
        }
    }
}

/// Summary over solved trials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DifficultyStats {
    pub trials: usize,
    pub solved_trials: usize,
    pub mean_backtracks: f64,
    pub p50_backtracks: f64,
    pub p90_backtracks: f64,
    pub mean_dead_ends: f64,
    pub p50_dead_ends: f64,
    pub p90_dead_ends: f64,
}

impl DifficultyStats {
    fn from_samples(trials: usize, mut backtracks: Vec<u64>, mut dead_ends: Vec<u64>) -> Self {
        backtracks.sort_unstable();
        dead_ends.sort_unstable();
        Self {
            trials,
            solved_trials: backtracks.len(),
            mean_backtracks: mean(&backtracks),
            p50_backtracks: percentile(&backtracks, 0.5),
            p90_backtracks: percentile(&backtracks, 0.9),
            mean_dead_ends: mean(&dead_ends),
            p50_dead_ends: percentile(&dead_ends, 0.5),
            p90_dead_ends: percentile(&dead_ends, 0.9),
        }
    }

    /// Scalar used for ranking; higher is harder
    pub fn score(&self) -> f64 {
        self.mean_backtracks
    }
}

fn mean(sorted: &[u64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.iter().sum::<u64>() as f64 / sorted.len() as f64
}

/// Nearest-rank percentile of an ascending slice
fn percentile(sorted: &[u64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1] as f64
}

/// Repeated randomized solver runs over one level
#[derive(Debug, Clone)]
pub struct DifficultySampler {
    config: SamplerConfig,
    rng: Prng,
}

impl Default for DifficultySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl DifficultySampler {
    /// Sampler seeded from the OS
    pub fn new() -> Self {
        let mut seed_bytes = [0u8; 4];
        getrandom::getrandom(&mut seed_bytes).unwrap_or_else(|_| {
            static COUNTER: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(1);
            let counter = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            seed_bytes = counter.to_le_bytes();
        });
        Self::with_seed(u32::from_le_bytes(seed_bytes))
    }

    /// Reproducible sampler
    pub fn with_seed(seed: u32) -> Self {
        Self {
            config: SamplerConfig::default(),
            rng: Prng::from_state(seed),
        }
    }

    pub fn with_config(mut self, config: SamplerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn sample(&mut self, level: &Level) -> DifficultyStats {
        let solver = Solver::new();
        let mut backtracks = Vec::with_capacity(self.config.trials);
        let mut dead_ends = Vec::with_capacity(self.config.trials);
        for trial in 0..self.config.trials {
            let options = SolveOptions {
                time_budget: self.config.trial_budget,
                max_solutions: 1,
                tie_break_seed: Some(self.rng.next_u32()),
                node_limit: self.config.node_limit,
                ..SolveOptions::default()
            };
            let report = solver.solve(level, &options);
            if report.is_solvable() {
                backtracks.push(report.backtracks);
                dead_ends.push(report.dead_ends);
            } else {
                debug!(trial, nodes = report.nodes, "difficulty trial unsolved");
            }
        }
        DifficultyStats::from_samples(self.config.trials, backtracks, dead_ends)
    }
}
