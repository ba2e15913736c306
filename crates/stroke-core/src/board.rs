//! Board geometry for one obstacle placement, plus an immutable path view.
//!
//! [`Board`] precomputes the usable-cell mask, the move graph (orthogonal steps plus
//! stitch diagonals), and the corner-clue edge table once per placement. Both the
//! solver and rule evaluation read from it.

use crate::level::{Cell, Level, Position, Vertex};
use std::collections::HashMap;

/// Geometry derived from a level and a movable-wall placement
#[derive(Debug, Clone)]
pub struct Board<'a> {
    level: &'a Level,
    placement: Vec<usize>,
    usable: Vec<bool>,
    usable_count: usize,
    /// Usable move targets per cell (orthogonal first, then stitch diagonals)
    moves: Vec<Vec<usize>>,
    /// Stitch diagonal partners per cell, regardless of usability
    diagonals: Vec<Vec<usize>>,
    /// Corner clue indices touched by each orthogonal edge, keyed by (low, high) cell index
    edge_clues: HashMap<(usize, usize), Vec<usize>>,
}

impl<'a> Board<'a> {
    /// Build a board with movable walls placed on `placement` (cell indices).
    pub fn new(level: &'a Level, placement: &[usize]) -> Self {
        let n = level.cell_count();
        let mut usable: Vec<bool> = level.cells().iter().map(|&c| c != Cell::Wall).collect();
        for &idx in placement {
            if idx < n {
                usable[idx] = false;
            }
        }
        let usable_count = usable.iter().filter(|&&u| u).count();

        let mut diagonals = vec![Vec::new(); n];
        for &v in level.stitches() {
            let [tl, tr, bl, br] = level.block_cells(v);
            diagonals[tl].push(br);
            diagonals[br].push(tl);
            diagonals[tr].push(bl);
            diagonals[bl].push(tr);
        }

        let mut moves = vec![Vec::new(); n];
        for idx in 0..n {
            if !usable[idx] {
                continue;
            }
            let targets = &mut moves[idx];
            targets.extend(level.neighbors4(idx).filter(|&m| usable[m]));
            targets.extend(diagonals[idx].iter().copied().filter(|&m| usable[m]));
        }

        let mut edge_clues: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (i, clue) in level.corners().iter().enumerate() {
            for edge in block_edges(level, clue.vertex) {
                edge_clues.entry(edge).or_default().push(i);
            }
        }

        Self {
            level,
            placement: placement.to_vec(),
            usable,
            usable_count,
            moves,
            diagonals,
            edge_clues,
        }
    }

    pub fn level(&self) -> &'a Level {
        self.level
    }

    pub fn placement(&self) -> &[usize] {
        &self.placement
    }

    #[inline]
    pub fn is_usable(&self, idx: usize) -> bool {
        self.usable[idx]
    }

    pub fn usable_count(&self) -> usize {
        self.usable_count
    }

    /// Usable cells reachable in one step
    #[inline]
    pub fn moves(&self, idx: usize) -> &[usize] {
        &self.moves[idx]
    }

    /// Stitch diagonal partners of a cell
    #[inline]
    pub fn diagonals(&self, idx: usize) -> &[usize] {
        &self.diagonals[idx]
    }

    /// Whether `a -> b` is a legal single step (ignoring usability)
    pub fn is_step(&self, a: usize, b: usize) -> bool {
        self.level.neighbors4(a).any(|m| m == b) || self.diagonals[a].contains(&b)
    }

    pub fn is_diagonal_step(&self, a: usize, b: usize) -> bool {
        self.diagonals[a].contains(&b)
    }

    /// Corner clue indices whose count an orthogonal step `a - b` contributes to
    pub fn clues_for_edge(&self, a: usize, b: usize) -> &[usize] {
        self.edge_clues
            .get(&(a.min(b), a.max(b)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cells that a placement may use, in index order
    pub fn placement_candidates(level: &Level) -> Vec<usize> {
        (0..level.cell_count())
            .filter(|&i| level.cell(i).accepts_movable())
            .collect()
    }
}

/// The four orthogonal cell adjacencies around a vertex, as (low, high) index pairs
pub fn block_edges(level: &Level, v: Vertex) -> [(usize, usize); 4] {
    let [tl, tr, bl, br] = level.block_cells(v);
    [(tl, tr), (bl, br), (tl, bl), (tr, br)]
}

/// Immutable snapshot of a board and a path, built once per validation call
#[derive(Debug)]
pub struct BoardView<'b, 'a> {
    pub board: &'b Board<'a>,
    pub path: &'b [usize],
    visited: Vec<bool>,
    order: Vec<Option<usize>>,
}

impl<'b, 'a> BoardView<'b, 'a> {
    pub fn new(board: &'b Board<'a>, path: &'b [usize]) -> Self {
        let n = board.level().cell_count();
        let mut visited = vec![false; n];
        let mut order = vec![None; n];
        for (i, &idx) in path.iter().enumerate() {
            if idx < n {
                visited[idx] = true;
                if order[idx].is_none() {
                    order[idx] = Some(i);
                }
            }
        }
        Self {
            board,
            path,
            visited,
            order,
        }
    }

    pub fn is_visited(&self, idx: usize) -> bool {
        self.visited.get(idx).copied().unwrap_or(false)
    }

    /// Position of a cell along the path
    pub fn order_of(&self, idx: usize) -> Option<usize> {
        self.order.get(idx).copied().flatten()
    }

    /// Whether `a` and `b` are consecutive along the path
    pub fn are_linked(&self, a: usize, b: usize) -> bool {
        match (self.order_of(a), self.order_of(b)) {
            (Some(i), Some(j)) => i.abs_diff(j) == 1,
            _ => false,
        }
    }

    pub fn position(&self, idx: usize) -> Position {
        self.board.level().position(idx)
    }
}
