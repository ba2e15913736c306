//! Covering path construction.
//!
//! Randomized depth-first search over orthogonal moves that must touch every row
//! and column. Branches that can no longer reach the untouched rows/columns within
//! the remaining length are pruned, candidates are ranked by a jittered score, and
//! each search is bounded by a node budget. When every randomized search fails the
//! builder falls back to a serpentine path, which covers all rows and columns by
//! construction.

use crate::rng::Prng;
use tracing::warn;

/// A built path as cell indices (row-major)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPath {
    pub cells: Vec<usize>,
    /// True when the serpentine fallback produced this path
    pub fallback: bool,
}

/// Randomized covering-path builder for a fixed grid size
#[derive(Debug, Clone)]
pub struct PathBuilder {
    rows: usize,
    cols: usize,
    attempts: usize,
    node_budget: usize,
}

impl PathBuilder {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            attempts: 24,
            node_budget: 5_000,
        }
    }

    pub fn with_budget(mut self, attempts: usize, node_budget: usize) -> Self {
        self.attempts = attempts;
        self.node_budget = node_budget;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Valid path lengths: `[rows + cols - 1, rows * cols]`
    pub fn clamp_length(&self, target: usize) -> usize {
        target.clamp(self.rows + self.cols - 1, self.rows * self.cols)
    }

    /// Build a simple path of `target` cells touching every row and column.
    pub fn build(&self, rng: &mut Prng, target: usize) -> BuiltPath {
        let target = self.clamp_length(target);
        let n = self.rows * self.cols;
        for _ in 0..self.attempts {
            let start = rng.next_int(n);
            let mut search = CoverSearch::new(self, rng, target);
            search.push(start);
            if search.extend() {
                return BuiltPath {
                    cells: search.path,
                    fallback: false,
                };
            }
        }
        warn!(
            rows = self.rows,
            cols = self.cols,
            target,
            "randomized path search exhausted, using serpentine"
        );
        self.serpentine(target)
    }

    /// Boustrophedon path truncated to `target`, extended as needed to reach the last row.
    pub fn serpentine(&self, target: usize) -> BuiltPath {
        let n = self.rows * self.cols;
        let len = self
            .clamp_length(target)
            .max((self.rows - 1) * self.cols + 1)
            .min(n);
        let mut cells = Vec::with_capacity(n);
        for row in 0..self.rows {
            if row % 2 == 0 {
                cells.extend((0..self.cols).map(|col| row * self.cols + col));
            } else {
                cells.extend((0..self.cols).rev().map(|col| row * self.cols + col));
            }
        }
        cells.truncate(len);
        BuiltPath {
            cells,
            fallback: true,
        }
    }

    /// Orthogonal neighbors of a cell index
    pub fn neighbors(&self, idx: usize) -> impl Iterator<Item = usize> {
        let (rows, cols) = (self.rows, self.cols);
        let (row, col) = (idx / cols, idx % cols);
        let up = (row > 0).then(|| idx - cols);
        let down = (row + 1 < rows).then(|| idx + cols);
        let left = (col > 0).then(|| idx - 1);
        let right = (col + 1 < cols).then(|| idx + 1);
        [up, right, down, left].into_iter().flatten()
    }

    /// Whether a path touches every row and column
    pub fn covers_all_lines(&self, cells: &[usize]) -> bool {
        let mut rows = vec![false; self.rows];
        let mut cols = vec![false; self.cols];
        for &c in cells {
            rows[c / self.cols] = true;
            cols[c % self.cols] = true;
        }
        rows.iter().all(|&r| r) && cols.iter().all(|&c| c)
    }
}

/// One bounded randomized search
struct CoverSearch<'a> {
    builder: &'a PathBuilder,
    rng: &'a mut Prng,
    target: usize,
    path: Vec<usize>,
    visited: Vec<bool>,
    row_touch: Vec<u8>,
    col_touch: Vec<u8>,
    untouched: usize,
    nodes: usize,
}

impl<'a> CoverSearch<'a> {
    fn new(builder: &'a PathBuilder, rng: &'a mut Prng, target: usize) -> Self {
        Self {
            builder,
            rng,
            target,
            path: Vec::with_capacity(target),
            visited: vec![false; builder.rows * builder.cols],
            row_touch: vec![0; builder.rows],
            col_touch: vec![0; builder.cols],
            untouched: builder.rows + builder.cols,
            nodes: 0,
        }
    }

    fn push(&mut self, idx: usize) {
        let (row, col) = (idx / self.builder.cols, idx % self.builder.cols);
        if self.row_touch[row] == 0 {
            self.untouched -= 1;
        }
        if self.col_touch[col] == 0 {
            self.untouched -= 1;
        }
        self.row_touch[row] += 1;
        self.col_touch[col] += 1;
        self.visited[idx] = true;
        self.path.push(idx);
    }

    fn pop(&mut self) {
        let Some(idx) = self.path.pop() else {
            return;
        };
        let (row, col) = (idx / self.builder.cols, idx % self.builder.cols);
        self.row_touch[row] -= 1;
        self.col_touch[col] -= 1;
        if self.row_touch[row] == 0 {
            self.untouched += 1;
        }
        if self.col_touch[col] == 0 {
            self.untouched += 1;
        }
        self.visited[idx] = false;
    }

    fn extend(&mut self) -> bool {
        if self.nodes >= self.builder.node_budget {
            return false;
        }
        self.nodes += 1;

        let remaining = self.target - self.path.len();
        if remaining == 0 {
            return self.untouched == 0;
        }
        // each orthogonal step changes exactly one coordinate
        if self.untouched > remaining {
            return false;
        }

        let Some(&head) = self.path.last() else {
            return false;
        };
        let open: Vec<usize> = self
            .builder
            .neighbors(head)
            .filter(|&c| !self.visited[c])
            .collect();
        let mut candidates: Vec<(f64, usize)> = Vec::with_capacity(open.len());
        for c in open {
            let score = self.score(c);
            candidates.push((score, c));
        }
        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        for (_, next) in candidates {
            self.push(next);
            if self.extend() {
                return true;
            }
            self.pop();
            if self.nodes >= self.builder.node_budget {
                return false;
            }
        }
        false
    }

    /// Higher is better: new rows/columns, fewer onward branches, plus jitter
    fn score(&mut self, idx: usize) -> f64 {
        let (row, col) = (idx / self.builder.cols, idx % self.builder.cols);
        let mut score = 0.0;
        if self.row_touch[row] == 0 {
            score += 2.0;
        }
        if self.col_touch[col] == 0 {
            score += 2.0;
        }
        let onward = self
            .builder
            .neighbors(idx)
            .filter(|&m| !self.visited[m])
            .count();
        score -= onward as f64 * 0.5;
        score + self.rng.next_f64() * 1.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_simple_orthogonal(builder: &PathBuilder, cells: &[usize]) {
        let mut seen = std::collections::HashSet::new();
        for &c in cells {
            assert!(seen.insert(c), "cell {} repeated", c);
        }
        for pair in cells.windows(2) {
            assert!(builder.neighbors(pair[0]).any(|m| m == pair[1]));
        }
    }

    #[test]
    fn test_build_reaches_target_and_covers() {
        let builder = PathBuilder::new(5, 6);
        let mut rng = Prng::from_seed_str("path-test");
        for target in [14, 18, 24] {
            let built = builder.build(&mut rng, target);
            if !built.fallback {
                assert_eq!(built.cells.len(), target);
            }
            assert!(builder.covers_all_lines(&built.cells));
            assert_simple_orthogonal(&builder, &built.cells);
        }
    }

    #[test]
    fn test_target_is_clamped() {
        let builder = PathBuilder::new(5, 5);
        let mut rng = Prng::from_seed_str("clamp");
        let built = builder.build(&mut rng, 2);
        assert!(built.cells.len() >= 9);
        if !built.fallback {
            assert_eq!(built.cells.len(), 9);
        }
        assert!(builder.covers_all_lines(&built.cells));
    }

    #[test]
    fn test_serpentine_fallback_covers() {
        let builder = PathBuilder::new(6, 5);
        let built = builder.serpentine(12);
        assert!(built.fallback);
        assert_eq!(built.cells.len(), 26);
        assert!(builder.covers_all_lines(&built.cells));
        assert_simple_orthogonal(&builder, &built.cells);
    }

    #[test]
    fn test_zero_budget_falls_back() {
        let builder = PathBuilder::new(5, 5).with_budget(0, 0);
        let mut rng = Prng::from_seed_str("empty-budget");
        let built = builder.build(&mut rng, 20);
        assert!(built.fallback);
        assert!(builder.covers_all_lines(&built.cells));
    }
}
