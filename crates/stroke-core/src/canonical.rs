//! Canonical fingerprints.
//!
//! Two levels that differ only by a rotation/reflection of the grid, or by relabeling
//! the cyclic tokens along their 3-cycle, describe the same puzzle. The canonical
//! signature is the lexicographically smallest serialization over every such
//! relabeling; the key is a 128-bit hash of it used for deduplication.
//!
//! Movable walls are written as open cells and contribute only their count, so where
//! they are displayed does not change the identity.

use crate::level::{Cell, CornerClue, Level, Position, Vertex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// First FNV-1a offset basis (the standard 64-bit one)
pub const FNV_SEED_A: u64 = 0xcbf2_9ce4_8422_2325;
/// Second, independent offset basis
pub const FNV_SEED_B: u64 = 0x6c62_272e_07bb_0142;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over `bytes` starting from `seed`
pub fn fnv1a64(bytes: &[u8], seed: u64) -> u64 {
    bytes
        .iter()
        .fold(seed, |h, &b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

// ==================== Transform group ====================

/// One element of the square's symmetry group: optional transpose, then optional
/// row and column flips on the (possibly transposed) grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transform {
    pub swap: bool,
    pub flip_rows: bool,
    pub flip_cols: bool,
}

impl Transform {
    pub const IDENTITY: Transform = Transform::new(false, false, false);

    /// All eight elements
    pub const ALL: [Transform; 8] = [
        Transform::new(false, false, false),
        Transform::new(false, false, true),
        Transform::new(false, true, false),
        Transform::new(false, true, true),
        Transform::new(true, false, false),
        Transform::new(true, false, true),
        Transform::new(true, true, false),
        Transform::new(true, true, true),
    ];

    pub const fn new(swap: bool, flip_rows: bool, flip_cols: bool) -> Self {
        Self {
            swap,
            flip_rows,
            flip_cols,
        }
    }

    /// Output dimensions for an input of `rows x cols`
    pub fn dims(self, rows: usize, cols: usize) -> (usize, usize) {
        if self.swap {
            (cols, rows)
        } else {
            (rows, cols)
        }
    }

    pub fn position(self, p: Position, rows: usize, cols: usize) -> Position {
        let (r, c) = if self.swap { (p.col, p.row) } else { (p.row, p.col) };
        let (out_rows, out_cols) = self.dims(rows, cols);
        Position::new(
            if self.flip_rows { out_rows - 1 - r } else { r },
            if self.flip_cols { out_cols - 1 - c } else { c },
        )
    }

    /// Vertices live on grid-line coordinates `0..=rows`, so flips reflect around `rows`.
    pub fn vertex(self, v: Vertex, rows: usize, cols: usize) -> Vertex {
        let (r, c) = if self.swap { (v.col, v.row) } else { (v.row, v.col) };
        let (out_rows, out_cols) = self.dims(rows, cols);
        Vertex::new(
            if self.flip_rows { out_rows - r } else { r },
            if self.flip_cols { out_cols - c } else { c },
        )
    }

    /// Cell code remap: transpose exchanges the axis-locked hints, an odd number of
    /// flips exchanges the rotational-sense hints.
    pub fn cell(self, cell: Cell) -> Cell {
        match cell {
            Cell::Hint(kind) => {
                let kind = if self.swap { kind.swap_axes() } else { kind };
                Cell::Hint(if self.flip_rows ^ self.flip_cols {
                    kind.mirror()
                } else {
                    kind
                })
            }
            other => other,
        }
    }
}

/// Apply a grid transform to a whole level.
pub fn transform_level(level: &Level, t: Transform) -> Level {
    let (rows, cols) = (level.rows(), level.cols());
    let (out_rows, out_cols) = t.dims(rows, cols);
    let mut out = Level::filled(out_rows, out_cols, Cell::Empty);
    for idx in 0..level.cell_count() {
        let to = t.position(level.position(idx), rows, cols);
        let to_idx = out.index(to);
        out.set(to_idx, t.cell(level.cell(idx)));
    }
    for &v in level.stitches() {
        out.push_stitch(t.vertex(v, rows, cols));
    }
    for clue in level.corners() {
        out.push_corner(CornerClue {
            vertex: t.vertex(clue.vertex, rows, cols),
            count: clue.count,
        });
    }
    out
}

/// Advance every cyclic token `steps` positions along the cycle.
pub fn rotate_tokens(level: &Level, steps: u8) -> Level {
    let mut out = level.clone();
    for idx in 0..out.cell_count() {
        if let Cell::Token(token) = out.cell(idx) {
            out.set(idx, Cell::Token(token.rotate(steps)));
        }
    }
    out
}

// ==================== Signature & key ====================

/// 128-bit canonical key rendered as 32 lowercase hex digits
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// Hash a canonical signature into a key
    pub fn from_signature(signature: &str) -> Self {
        let bytes = signature.as_bytes();
        Self(format!(
            "{:016x}{:016x}",
            fnv1a64(bytes, FNV_SEED_A),
            fnv1a64(bytes, FNV_SEED_B)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CanonicalKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical signature plus its key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub signature: String,
    pub key: CanonicalKey,
}

/// Serialize one relabeling of `level` without materializing the transformed level.
fn serialize(level: &Level, t: Transform, token_steps: u8) -> String {
    let (rows, cols) = (level.rows(), level.cols());
    let (out_rows, out_cols) = t.dims(rows, cols);

    let mut grid = vec!['.'; out_rows * out_cols];
    for idx in 0..level.cell_count() {
        let to = t.position(level.position(idx), rows, cols);
        let code = match t.cell(level.cell(idx)) {
            Cell::MovableWall => '.',
            Cell::Token(token) => token.rotate(token_steps).code(),
            other => other.code(),
        };
        grid[to.row * out_cols + to.col] = code;
    }
    let grid_rows: Vec<String> = grid
        .chunks(out_cols)
        .map(|row| row.iter().collect())
        .collect();

    let mut stitches: Vec<Vertex> = level
        .stitches()
        .iter()
        .map(|&v| t.vertex(v, rows, cols))
        .collect();
    stitches.sort_unstable();
    let stitches: Vec<String> = stitches
        .iter()
        .map(|v| format!("{},{}", v.row, v.col))
        .collect();

    let mut corners: Vec<(Vertex, u8)> = level
        .corners()
        .iter()
        .map(|c| (t.vertex(c.vertex, rows, cols), c.count))
        .collect();
    corners.sort_unstable();
    let corners: Vec<String> = corners
        .iter()
        .map(|(v, n)| format!("{},{},{}", v.row, v.col, n))
        .collect();

    format!(
        "{}x{}|{}|s:{}|c:{}|m:{}",
        out_rows,
        out_cols,
        grid_rows.join("/"),
        stitches.join(";"),
        corners.join(";"),
        level.movable_count()
    )
}

/// Lexicographically smallest serialization over the symmetry group (and token
/// rotations when tokens are present).
pub fn canonical_signature(level: &Level) -> String {
    let rotations: u8 = if level.token_count() > 0 { 3 } else { 1 };
    let mut best: Option<String> = None;
    for t in Transform::ALL {
        for steps in 0..rotations {
            let candidate = serialize(level, t, steps);
            if best.as_ref().map_or(true, |b| candidate < *b) {
                best = Some(candidate);
            }
        }
    }
    best.unwrap_or_default()
}

pub fn canonical_fingerprint(level: &Level) -> Fingerprint {
    let signature = canonical_signature(level);
    let key = CanonicalKey::from_signature(&signature);
    Fingerprint { signature, key }
}

/// Shorthand for the key alone
pub fn canonical_key(level: &Level) -> CanonicalKey {
    canonical_fingerprint(level).key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Level {
        Level::from_rows(&["..h.", "#.uR", ".P.."])
            .unwrap()
            .with_constraints(
                vec![Vertex::new(1, 1)],
                vec![CornerClue {
                    vertex: Vertex::new(2, 3),
                    count: 2,
                }],
            )
            .unwrap()
    }

    #[test]
    fn test_fnv_reference_value() {
        // FNV-1a 64 of "a" with the standard basis
        assert_eq!(fnv1a64(b"a", FNV_SEED_A), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a64(b"", FNV_SEED_B), FNV_SEED_B);
    }

    #[test]
    fn test_key_shape() {
        let key = canonical_key(&sample());
        assert_eq!(key.as_str().len(), 32);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_invariant_under_all_transforms() {
        let level = sample();
        let key = canonical_key(&level);
        for t in Transform::ALL {
            let moved = transform_level(&level, t);
            assert_eq!(canonical_key(&moved), key, "{:?}", t);
        }
    }

    #[test]
    fn test_invariant_under_token_rotation() {
        let level = sample();
        let key = canonical_key(&level);
        assert_eq!(canonical_key(&rotate_tokens(&level, 1)), key);
        assert_eq!(canonical_key(&rotate_tokens(&level, 2)), key);
    }

    #[test]
    fn test_transpose_swaps_axis_hints() {
        let level = Level::from_rows(&["h.", ".u"]).unwrap();
        let moved = transform_level(&level, Transform::new(true, false, false));
        assert_eq!(moved.to_rows(), vec!["v.", ".u"]);
        let mirrored = transform_level(&level, Transform::new(false, false, true));
        assert_eq!(mirrored.to_rows(), vec![".h", "d."]);
    }

    #[test]
    fn test_vertex_remap_stays_interior() {
        let level = sample();
        for t in Transform::ALL {
            let moved = transform_level(&level, t);
            for v in moved.stitches() {
                assert!(moved.is_interior_vertex(*v));
            }
            for c in moved.corners() {
                assert!(moved.is_interior_vertex(c.vertex));
            }
        }
    }

    #[test]
    fn test_movable_position_not_identity() {
        let a = Level::from_rows(&["m..", "...", "..#"]).unwrap();
        let b = Level::from_rows(&["...", ".m.", "..#"]).unwrap();
        let c = Level::from_rows(&["...", "...", "..#"]).unwrap();
        assert_eq!(canonical_key(&a), canonical_key(&b));
        assert_ne!(canonical_key(&a), canonical_key(&c));
    }

    #[test]
    fn test_distinct_levels_distinct_keys() {
        let a = Level::from_rows(&["..#", "...", "..."]).unwrap();
        let b = Level::from_rows(&[".#.", "...", "..."]).unwrap();
        assert_ne!(canonical_key(&a), canonical_key(&b));
    }

    #[test]
    fn test_signature_ignores_clue_order() {
        let clues = vec![
            CornerClue {
                vertex: Vertex::new(1, 1),
                count: 1,
            },
            CornerClue {
                vertex: Vertex::new(2, 2),
                count: 0,
            },
        ];
        let mut reversed = clues.clone();
        reversed.reverse();
        let base = Level::from_rows(&["...", "...", "..."]).unwrap();
        let a = base.clone().with_constraints(vec![], clues).unwrap();
        let b = base.with_constraints(vec![], reversed).unwrap();
        assert_eq!(canonical_signature(&a), canonical_signature(&b));
    }
}
