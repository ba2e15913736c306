//! Depth-first path search for one placement.
//!
//! Every extension is checked incrementally: the cell that just became interior
//! gets its hint and stitch checks, tokens advance a [`TokenSequence`], corner
//! counts may never exceed their clue, and the unvisited cells must stay reachable
//! from the head with at most one forced endpoint among them.

use super::{SolveOptions, Solution};
use crate::board::Board;
use crate::level::Cell;
use crate::rng::Prng;
use crate::rules::{hint_satisfied, TokenSequence};
use std::collections::HashSet;
use std::time::Instant;

/// Counters and dedup sets shared by every placement of one solve call
#[derive(Debug)]
pub(super) struct Tally {
    pub raw: HashSet<Vec<usize>>,
    pub canonical: HashSet<Vec<usize>>,
    pub nodes: u64,
    pub backtracks: u64,
    pub dead_ends: u64,
    pub timed_out: bool,
    pub node_limit_hit: bool,
    pub stop: bool,
    pub first: Option<Solution>,
    pub rng: Option<Prng>,
    /// None when the budget is too large to represent
    deadline: Option<Instant>,
}

impl Tally {
    pub fn new(options: &SolveOptions) -> Self {
        Self {
            raw: HashSet::new(),
            canonical: HashSet::new(),
            nodes: 0,
            backtracks: 0,
            dead_ends: 0,
            timed_out: false,
            node_limit_hit: false,
            stop: false,
            first: None,
            rng: options.tie_break_seed.map(Prng::from_state),
            deadline: Instant::now().checked_add(options.time_budget),
        }
    }

    /// Count a node and check the budgets.
    fn tick(&mut self, options: &SolveOptions) {
        self.nodes += 1;
        if self.nodes & 0xff == 0 && self.deadline.is_some_and(|d| Instant::now() >= d) {
            self.timed_out = true;
            self.stop = true;
        }
        if options.node_limit.is_some_and(|limit| self.nodes >= limit) {
            self.node_limit_hit = true;
            self.stop = true;
        }
    }

    fn thresholds_met(&self, options: &SolveOptions) -> bool {
        if self.raw.len() >= options.max_solutions {
            return true;
        }
        (options.min_raw > 0 || options.min_canonical > 0)
            && self.raw.len() >= options.min_raw
            && self.canonical.len() >= options.min_canonical
    }
}

/// Undo information for one pushed cell
#[derive(Debug, Clone, Copy)]
struct Frame {
    tokens: TokenSequence,
    edge: Option<(usize, usize)>,
}

pub(super) struct Search<'s, 'a> {
    board: &'s Board<'a>,
    options: &'s SolveOptions,
    tally: &'s mut Tally,
    path: Vec<usize>,
    frames: Vec<Frame>,
    visited: Vec<bool>,
    tokens: TokenSequence,
    corner_counts: Vec<u8>,
    // flood-fill scratch
    seen: Vec<bool>,
    stack: Vec<usize>,
}

impl<'s, 'a> Search<'s, 'a> {
    pub fn new(board: &'s Board<'a>, options: &'s SolveOptions, tally: &'s mut Tally) -> Self {
        let n = board.level().cell_count();
        Self {
            board,
            options,
            tally,
            path: Vec::with_capacity(board.usable_count()),
            frames: Vec::with_capacity(board.usable_count()),
            visited: vec![false; n],
            tokens: TokenSequence::default(),
            corner_counts: vec![0; board.level().corners().len()],
            seen: vec![false; n],
            stack: Vec::with_capacity(n),
        }
    }

    pub fn run(&mut self) {
        let level = self.board.level();
        let mut starts: Vec<usize> = (0..level.cell_count())
            .filter(|&i| self.board.is_usable(i) && !level.cell(i).is_hint())
            .collect();
        if let Some(rng) = self.tally.rng.as_mut() {
            rng.shuffle(&mut starts);
        }
        for start in starts {
            if self.tally.stop {
                return;
            }
            self.step(start);
        }
    }

    /// Push `idx`, explore below it if the prefix holds, then pop.
    fn step(&mut self, idx: usize) {
        let found_before = self.tally.raw.len();
        if self.push(idx) {
            self.descend();
        } else {
            self.tally.dead_ends += 1;
        }
        self.pop();
        if self.tally.raw.len() == found_before {
            self.tally.backtracks += 1;
        }
    }

    fn descend(&mut self) {
        if self.tally.stop {
            return;
        }
        if self.path.len() == self.board.usable_count() {
            self.complete();
            return;
        }
        let Some(&head) = self.path.last() else {
            return;
        };
        let mut next: Vec<usize> = self
            .board
            .moves(head)
            .iter()
            .copied()
            .filter(|&m| !self.visited[m])
            .collect();
        if let Some(rng) = self.tally.rng.as_mut() {
            rng.shuffle(&mut next);
        }
        for m in next {
            if self.tally.stop {
                return;
            }
            self.step(m);
        }
    }

    /// Extend the prefix; returns whether it still admits a solution.
    /// State is updated even on failure so [`Search::pop`] can always undo.
    fn push(&mut self, idx: usize) -> bool {
        self.tally.tick(self.options);
        let prev = self.path.last().copied();
        let edge = prev.filter(|&p| !self.board.is_diagonal_step(p, idx));
        self.frames.push(Frame {
            tokens: self.tokens,
            edge: edge.map(|p| (p, idx)),
        });
        self.path.push(idx);
        self.visited[idx] = true;

        let mut ok = true;
        if let Some(token) = self.board.level().cell(idx).token() {
            ok &= self.tokens.push(token);
        }
        if let Some(p) = edge {
            for &clue in self.board.clues_for_edge(p, idx) {
                self.corner_counts[clue] += 1;
                ok &= self.corner_counts[clue] <= self.board.level().corners()[clue].count;
            }
        }
        ok && self.completed_cell_ok() && self.remainder_ok()
    }

    fn pop(&mut self) {
        let Some(idx) = self.path.pop() else {
            return;
        };
        self.visited[idx] = false;
        if let Some(frame) = self.frames.pop() {
            self.tokens = frame.tokens;
            if let Some((a, b)) = frame.edge {
                for &clue in self.board.clues_for_edge(a, b) {
                    self.corner_counts[clue] -= 1;
                }
            }
        }
    }

    /// The cell before the head now has both of its path neighbors fixed.
    fn completed_cell_ok(&self) -> bool {
        let len = self.path.len();
        if len < 2 {
            return true;
        }
        let level = self.board.level();
        let p = self.path[len - 2];
        let head = self.path[len - 1];
        let before = (len >= 3).then(|| self.path[len - 3]);

        if let Cell::Hint(kind) = level.cell(p) {
            let Some(b) = before else {
                return false;
            };
            if !hint_satisfied(kind, level.position(p), level.position(b), level.position(head)) {
                return false;
            }
        }
        self.board
            .diagonals(p)
            .iter()
            .all(|&d| d == head || Some(d) == before)
    }

    /// Unvisited usable cells must be reachable from the head, with at most one
    /// forced endpoint (a cell with a single way in) among them.
    fn remainder_ok(&mut self) -> bool {
        let remaining = self.board.usable_count() - self.path.len();
        if remaining == 0 {
            return true;
        }
        let Some(&head) = self.path.last() else {
            return true;
        };
        let level = self.board.level();

        let mut forced = 0;
        for u in 0..level.cell_count() {
            if self.visited[u] || !self.board.is_usable(u) {
                continue;
            }
            let degree = self
                .board
                .moves(u)
                .iter()
                .filter(|&&m| !self.visited[m] || m == head)
                .count();
            match degree {
                0 => return false,
                1 => {
                    if level.cell(u).is_hint() {
                        return false;
                    }
                    forced += 1;
                    if forced > 1 {
                        return false;
                    }
                }
                _ => {}
            }
        }

        self.seen.iter_mut().for_each(|s| *s = false);
        self.stack.clear();
        self.stack.push(head);
        self.seen[head] = true;
        let mut reached = 0;
        while let Some(c) = self.stack.pop() {
            for &m in self.board.moves(c) {
                if !self.seen[m] && !self.visited[m] {
                    self.seen[m] = true;
                    reached += 1;
                    self.stack.push(m);
                }
            }
        }
        reached == remaining
    }

    fn complete(&mut self) {
        let level = self.board.level();
        let len = self.path.len();
        let Some(&head) = self.path.last() else {
            return;
        };
        if level.cell(head).is_hint() {
            return;
        }
        let before = (len >= 2).then(|| self.path[len - 2]);
        if !self
            .board
            .diagonals(head)
            .iter()
            .all(|&d| Some(d) == before)
        {
            return;
        }
        if level
            .corners()
            .iter()
            .zip(&self.corner_counts)
            .any(|(clue, &n)| n != clue.count)
        {
            return;
        }

        let mut placement = self.board.placement().to_vec();
        placement.sort_unstable();
        let mut forward = placement.clone();
        forward.push(usize::MAX);
        let mut backward = forward.clone();
        forward.extend_from_slice(&self.path);
        backward.extend(self.path.iter().rev());
        let canonical = forward.clone().min(backward);

        if self.tally.first.is_none() {
            self.tally.first = Some(Solution {
                placement: placement.iter().map(|&i| level.position(i)).collect(),
                path: self.path.iter().map(|&i| level.position(i)).collect(),
            });
        }
        self.tally.raw.insert(forward);
        self.tally.canonical.insert(canonical);
        if self.tally.thresholds_met(self.options) {
            self.tally.stop = true;
        }
    }
}
