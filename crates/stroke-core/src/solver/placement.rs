//! Movable-wall placement enumeration.

use crate::board::Board;

/// Lexicographic k-subsets of `0..n`, as index vectors
#[derive(Debug, Clone)]
pub(super) struct Combinations {
    n: usize,
    current: Option<Vec<usize>>,
}

impl Combinations {
    pub(super) fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            current: (k <= n).then(|| (0..k).collect()),
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let out = self.current.clone()?;
        let k = out.len();
        let mut next = out.clone();
        // rightmost slot that can still advance
        let mut i = k;
        loop {
            if i == 0 {
                self.current = None;
                break;
            }
            i -= 1;
            if next[i] < self.n - k + i {
                next[i] += 1;
                for j in i + 1..k {
                    next[j] = next[j - 1] + 1;
                }
                self.current = Some(next);
                break;
            }
        }
        Some(out)
    }
}

/// A stitch needs all four block cells; a placement covering any of them is hopeless.
pub(super) fn stitches_open(board: &Board<'_>) -> bool {
    let level = board.level();
    level
        .stitches()
        .iter()
        .all(|&v| level.block_cells(v).iter().all(|&c| board.is_usable(c)))
}
