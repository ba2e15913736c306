//! Rule evaluation for a completed path.
//!
//! [`evaluate`] is the authoritative check that a path (and movable-wall placement)
//! solves a level. Generation replays every witness through it before returning, and
//! the daily scheduler treats a clean replay as proof of solvability.

use crate::board::{Board, BoardView};
use crate::level::{Cell, Direction, HintKind, Level, Position, Token, Vertex};
use serde::{Deserialize, Serialize};

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    /// Wrong number of movable walls placed
    PlacementCount { expected: usize, found: usize },
    /// A movable wall sits on a cell that cannot hold one, or two share a cell
    PlacementCell(Position),
    /// Path index outside the grid
    OffBoard(usize),
    /// Path enters an obstacle
    Blocked(Position),
    /// Path visits a cell twice
    Revisited(Position),
    /// Consecutive path cells are not a legal step
    NotAdjacent(Position, Position),
    /// Path does not cover every usable cell
    Incomplete { visited: usize, required: usize },
    /// A hint cell is a path endpoint
    HintAtEndpoint(Position),
    /// A hint cell's shape is not satisfied
    Hint(Position, HintKind),
    /// A stitch diagonal is not a path step
    Stitch(Vertex),
    /// Token met out of cyclic order
    TokenOrder(Position),
    /// Corner clue count mismatch
    Corner {
        vertex: Vertex,
        expected: u8,
        found: u8,
    },
}

/// Outcome of evaluating a path against a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub visited: usize,
    pub required: usize,
    pub violations: Vec<Violation>,
}

impl Evaluation {
    /// Fully satisfied completion state; a board with no usable cell has none
    pub fn is_solved(&self) -> bool {
        self.required > 0 && self.violations.is_empty() && self.visited == self.required
    }
}

/// Evaluate `path` (cell positions in visiting order) with movable walls on `placement`.
pub fn evaluate(level: &Level, placement: &[Position], path: &[Position]) -> Evaluation {
    let n = level.cell_count();
    let mut violations = Vec::new();

    let place_idx: Vec<usize> = placement
        .iter()
        .map(|&p| {
            if p.row < level.rows() && p.col < level.cols() {
                level.index(p)
            } else {
                usize::MAX
            }
        })
        .collect();
    let expected = level.movable_count();
    if place_idx.len() != expected {
        violations.push(Violation::PlacementCount {
            expected,
            found: place_idx.len(),
        });
    }
    let mut taken = vec![false; n];
    for (&idx, &pos) in place_idx.iter().zip(placement) {
        if idx >= n || !level.cell(idx).accepts_movable() || taken[idx] {
            violations.push(Violation::PlacementCell(pos));
        } else {
            taken[idx] = true;
        }
    }

    let board = Board::new(level, &place_idx);
    let path_idx: Vec<usize> = path
        .iter()
        .map(|&p| {
            if p.row < level.rows() && p.col < level.cols() {
                level.index(p)
            } else {
                usize::MAX
            }
        })
        .collect();

    let mut seen = vec![false; n];
    for (i, &idx) in path_idx.iter().enumerate() {
        if idx >= n {
            violations.push(Violation::OffBoard(i));
            continue;
        }
        let pos = level.position(idx);
        if !board.is_usable(idx) {
            violations.push(Violation::Blocked(pos));
        }
        if seen[idx] {
            violations.push(Violation::Revisited(pos));
        }
        seen[idx] = true;
        if i > 0 {
            let prev = path_idx[i - 1];
            if prev < n && !board.is_step(prev, idx) {
                violations.push(Violation::NotAdjacent(level.position(prev), pos));
            }
        }
    }
    if !violations.is_empty() {
        return Evaluation {
            visited: seen.iter().filter(|&&s| s).count(),
            required: board.usable_count(),
            violations,
        };
    }

    let view = BoardView::new(&board, &path_idx);
    check_hints(&view, &mut violations);
    check_stitches(&view, &mut violations);
    check_tokens(&view, &mut violations);
    check_corners(&view, &mut violations);

    let visited = path_idx.len();
    let required = board.usable_count();
    if visited != required {
        violations.push(Violation::Incomplete { visited, required });
    }
    Evaluation {
        visited,
        required,
        violations,
    }
}

fn check_hints(view: &BoardView<'_, '_>, out: &mut Vec<Violation>) {
    let level = view.board.level();
    let path = view.path;
    for (i, &idx) in path.iter().enumerate() {
        let Cell::Hint(kind) = level.cell(idx) else {
            continue;
        };
        let pos = level.position(idx);
        if i == 0 || i + 1 == path.len() {
            out.push(Violation::HintAtEndpoint(pos));
            continue;
        }
        let prev = level.position(path[i - 1]);
        let next = level.position(path[i + 1]);
        if !hint_satisfied(kind, pos, prev, next) {
            out.push(Violation::Hint(pos, kind));
        }
    }
}

fn check_stitches(view: &BoardView<'_, '_>, out: &mut Vec<Violation>) {
    let level = view.board.level();
    for &v in level.stitches() {
        let [tl, tr, bl, br] = level.block_cells(v);
        if !view.are_linked(tl, br) || !view.are_linked(tr, bl) {
            out.push(Violation::Stitch(v));
        }
    }
}

fn check_tokens(view: &BoardView<'_, '_>, out: &mut Vec<Violation>) {
    let level = view.board.level();
    let mut seq = TokenSequence::default();
    for &idx in view.path {
        if let Some(token) = level.cell(idx).token() {
            if !seq.push(token) {
                out.push(Violation::TokenOrder(level.position(idx)));
                return;
            }
        }
    }
}

fn check_corners(view: &BoardView<'_, '_>, out: &mut Vec<Violation>) {
    let level = view.board.level();
    let mut counts = vec![0u8; level.corners().len()];
    for pair in view.path.windows(2) {
        if view.board.is_diagonal_step(pair[0], pair[1]) {
            continue;
        }
        for &clue in view.board.clues_for_edge(pair[0], pair[1]) {
            counts[clue] += 1;
        }
    }
    for (clue, &found) in level.corners().iter().zip(&counts) {
        if found != clue.count {
            out.push(Violation::Corner {
                vertex: clue.vertex,
                expected: clue.count,
                found,
            });
        }
    }
}

/// Whether a hint at `at`, entered from `prev` and left to `next`, is satisfied.
/// Diagonal steps never satisfy a hint.
pub fn hint_satisfied(kind: HintKind, at: Position, prev: Position, next: Position) -> bool {
    match (Direction::between(at, prev), Direction::between(at, next)) {
        (Some(a), Some(b)) => kind.accepts(a, b),
        _ => false,
    }
}

/// Incremental cyclic-order checker. Tokens must step consistently along the cycle,
/// all forward or all backward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenSequence {
    last: Option<Token>,
    step: Option<u8>,
}

impl TokenSequence {
    /// Push the next token met; returns false on an ordering violation.
    pub fn push(&mut self, token: Token) -> bool {
        let Some(last) = self.last else {
            self.last = Some(token);
            return true;
        };
        let step = token.step_from(last);
        if step == 0 {
            return false;
        }
        match self.step {
            Some(s) if s != step => return false,
            _ => self.step = Some(step),
        }
        self.last = Some(token);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::CornerClue;

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn test_snake_solves_plain_grid() {
        let level = Level::from_rows(&["...", "..."]).unwrap();
        let path = [p(0, 0), p(0, 1), p(0, 2), p(1, 2), p(1, 1), p(1, 0)];
        assert!(evaluate(&level, &[], &path).is_solved());
    }

    #[test]
    fn test_incomplete_and_revisit() {
        let level = Level::from_rows(&["...", "..."]).unwrap();
        let short = [p(0, 0), p(0, 1)];
        let eval = evaluate(&level, &[], &short);
        assert!(!eval.is_solved());
        assert!(eval
            .violations
            .contains(&Violation::Incomplete { visited: 2, required: 6 }));

        let twice = [p(0, 0), p(0, 1), p(0, 0)];
        assert!(evaluate(&level, &[], &twice)
            .violations
            .contains(&Violation::Revisited(p(0, 0))));
    }

    #[test]
    fn test_hint_rules() {
        let level = Level::from_rows(&[".h.", "..."]).unwrap();
        let good = [p(0, 0), p(0, 1), p(0, 2), p(1, 2), p(1, 1), p(1, 0)];
        assert!(evaluate(&level, &[], &good).is_solved());

        let level = Level::from_rows(&[".v.", "..."]).unwrap();
        let eval = evaluate(&level, &[], &good);
        assert!(eval.violations.contains(&Violation::Hint(p(0, 1), HintKind::Vertical)));

        let level = Level::from_rows(&["t..", "..."]).unwrap();
        let eval = evaluate(&level, &[], &good);
        assert!(eval.violations.contains(&Violation::HintAtEndpoint(p(0, 0))));
    }

    #[test]
    fn test_stitch_requires_both_diagonals() {
        let level = Level::from_rows(&["..", ".."])
            .unwrap()
            .with_constraints(vec![Vertex::new(1, 1)], vec![])
            .unwrap();
        let crossing = [p(0, 0), p(1, 1), p(0, 1), p(1, 0)];
        assert!(evaluate(&level, &[], &crossing).is_solved());

        let loop_path = [p(0, 0), p(0, 1), p(1, 1), p(1, 0)];
        let eval = evaluate(&level, &[], &loop_path);
        assert!(eval.violations.contains(&Violation::Stitch(Vertex::new(1, 1))));
    }

    #[test]
    fn test_diagonal_without_stitch_rejected() {
        let level = Level::from_rows(&["..", ".."]).unwrap();
        let crossing = [p(0, 0), p(1, 1), p(0, 1), p(1, 0)];
        let eval = evaluate(&level, &[], &crossing);
        assert!(eval
            .violations
            .contains(&Violation::NotAdjacent(p(0, 0), p(1, 1))));
    }

    #[test]
    fn test_token_order_either_direction() {
        let level = Level::from_rows(&["RPS"]).unwrap();
        let forward = [p(0, 0), p(0, 1), p(0, 2)];
        let backward = [p(0, 2), p(0, 1), p(0, 0)];
        assert!(evaluate(&level, &[], &forward).is_solved());
        assert!(evaluate(&level, &[], &backward).is_solved());

        let level = Level::from_rows(&["RPR.P"]).unwrap();
        let path = [p(0, 0), p(0, 1), p(0, 2), p(0, 3), p(0, 4)];
        let eval = evaluate(&level, &[], &path);
        assert_eq!(eval.violations, vec![Violation::TokenOrder(p(0, 2))]);
    }

    #[test]
    fn test_corner_counts() {
        let level = Level::from_rows(&["...", "..."])
            .unwrap()
            .with_constraints(
                vec![],
                vec![CornerClue {
                    vertex: Vertex::new(1, 1),
                    count: 3,
                }],
            )
            .unwrap();
        // snake uses (0,0)-(0,1), (1,1)-(1,0): two edges around vertex (1,1)
        let snake = [p(0, 0), p(0, 1), p(0, 2), p(1, 2), p(1, 1), p(1, 0)];
        let eval = evaluate(&level, &[], &snake);
        assert_eq!(
            eval.violations,
            vec![Violation::Corner {
                vertex: Vertex::new(1, 1),
                expected: 3,
                found: 2
            }]
        );
        let hook = [p(0, 2), p(1, 2), p(1, 1), p(1, 0), p(0, 0), p(0, 1)];
        assert!(evaluate(&level, &[], &hook).is_solved());
    }

    #[test]
    fn test_movable_wall_placement() {
        let level = Level::from_rows(&["m..", "..#"]).unwrap();
        // wall moved to (1,1): usable (0,0),(0,1),(0,2),(1,0)
        let path = [p(1, 0), p(0, 0), p(0, 1), p(0, 2)];
        assert!(evaluate(&level, &[p(1, 1)], &path).is_solved());

        let eval = evaluate(&level, &[], &path);
        assert!(eval
            .violations
            .contains(&Violation::PlacementCount { expected: 1, found: 0 }));

        let eval = evaluate(&level, &[p(1, 2)], &path);
        assert!(eval.violations.contains(&Violation::PlacementCell(p(1, 2))));
    }

    #[test]
    fn test_token_sequence_tracker() {
        let mut seq = TokenSequence::default();
        assert!(seq.push(Token::Scissors));
        assert!(seq.push(Token::Paper));
        assert!(seq.push(Token::Rock));
        assert!(!seq.push(Token::Paper));
    }
}
