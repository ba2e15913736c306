//! Exhaustive constraint solver.
//!
//! Enumerates every movable-wall placement, then every simple path covering the
//! usable cells of that placement. Results are deduplicated twice: by the raw cell
//! sequence and by a reversal-invariant key. The search is bounded by a wall-clock
//! deadline and an optional node limit; hitting either is reported, never raised.

mod placement;
mod search;

use crate::board::Board;
use crate::level::{Level, Position};
use placement::{stitches_open, Combinations};
use search::{Search, Tally};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Options for one solve call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOptions {
    /// Wall-clock budget for the whole call
    pub time_budget: Duration,
    /// Stop once this many raw solutions are found (with `min_canonical`); 0 disables
    pub min_raw: usize,
    /// Stop once this many reversal-distinct solutions are found (with `min_raw`); 0 disables
    pub min_canonical: usize,
    /// Hard cap on raw solutions
    pub max_solutions: usize,
    /// Shuffle start cells and moves with this seed
    pub tie_break_seed: Option<u32>,
    /// Deterministic alternative to the deadline
    pub node_limit: Option<u64>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(2),
            min_raw: 0,
            min_canonical: 0,
            max_solutions: 10_000,
            tie_break_seed: None,
            node_limit: None,
        }
    }
}

impl SolveOptions {
    /// Stop at the first solution
    pub fn first() -> Self {
        Self {
            max_solutions: 1,
            ..Self::default()
        }
    }

    /// Stop as soon as a second distinct solution shows up
    pub fn uniqueness() -> Self {
        Self {
            min_canonical: 2,
            ..Self::default()
        }
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }
}

/// One solution: where the movable walls go, and the path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub placement: Vec<Position>,
    pub path: Vec<Position>,
}

/// Solve outcome. Counts are partial when `timed_out` or `node_limit_hit` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveReport {
    pub raw_solutions: usize,
    pub canonical_solutions: usize,
    pub timed_out: bool,
    pub node_limit_hit: bool,
    pub nodes: u64,
    pub backtracks: u64,
    pub dead_ends: u64,
    pub placements_tried: usize,
    pub first_solution: Option<Solution>,
}

impl SolveReport {
    pub fn is_solvable(&self) -> bool {
        self.raw_solutions > 0
    }

    /// Exactly one solution up to reversal, with the search run to completion
    pub fn is_unique(&self) -> bool {
        self.canonical_solutions == 1 && !self.timed_out && !self.node_limit_hit
    }
}

/// Unit struct solver; all state is per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Solver;

impl Solver {
    pub fn new() -> Self {
        Self
    }

    pub fn solve(&self, level: &Level, options: &SolveOptions) -> SolveReport {
        let mut tally = Tally::new(options);
        let candidates = Board::placement_candidates(level);
        let k = level.movable_count();
        let mut placements_tried = 0;

        for combo in Combinations::new(candidates.len(), k) {
            if tally.stop {
                break;
            }
            let placement: Vec<usize> = combo.iter().map(|&i| candidates[i]).collect();
            let board = Board::new(level, &placement);
            if board.usable_count() == 0 || !stitches_open(&board) {
                continue;
            }
            placements_tried += 1;
            debug!(?placement, usable = board.usable_count(), "searching placement");
            Search::new(&board, options, &mut tally).run();
        }

        if tally.timed_out {
            warn!(
                nodes = tally.nodes,
                raw = tally.raw.len(),
                budget_ms = options.time_budget.as_millis() as u64,
                "solver deadline exceeded, counts are partial"
            );
        }
        SolveReport {
            raw_solutions: tally.raw.len(),
            canonical_solutions: tally.canonical.len(),
            timed_out: tally.timed_out,
            node_limit_hit: tally.node_limit_hit,
            nodes: tally.nodes,
            backtracks: tally.backtracks,
            dead_ends: tally.dead_ends,
            placements_tried,
            first_solution: tally.first,
        }
    }
}

/// Solve with a fresh [`Solver`]
pub fn solve(level: &Level, options: &SolveOptions) -> SolveReport {
    Solver::new().solve(level, options)
}
