//! Feature injection and density balancing.
//!
//! Decorates a covering path with stitches, a cyclic token chain, shape hints,
//! corner clues and relocatable obstacles, then nudges the constraint density into
//! the configured band. Every decoration is read off the witness path, so the
//! witness stays a valid solution throughout.

use super::path::PathBuilder;
use super::{FeatureTag, GenerateErrorKind, GeneratorConfig, Witness};
use crate::board::block_edges;
use crate::level::{
    turn_class, Cell, CornerClue, Direction, HintKind, Level, Position, Token, Vertex,
    MAX_CORNER_COUNT,
};
use crate::rng::Prng;
use tracing::debug;

const EPS: f64 = 1e-9;

/// Level and witness produced by decoration
pub(super) struct Decorated {
    pub level: Level,
    pub witness: Witness,
}

/// Which feature families are enabled for one attempt
#[derive(Debug, Clone, Copy)]
struct Families {
    hints: bool,
    cyclic: bool,
    stitch: bool,
    movable: bool,
    corner: bool,
}

impl Families {
    /// The required tag is always on; every other family gets a small independent chance.
    fn choose(rng: &mut Prng, tag: FeatureTag) -> Self {
        let mut families = Families {
            hints: rng.chance(0.55),
            cyclic: rng.chance(0.20),
            stitch: rng.chance(0.20),
            movable: rng.chance(0.12),
            corner: rng.chance(0.25),
        };
        match tag {
            FeatureTag::Stitch => families.stitch = true,
            FeatureTag::Hints => families.hints = true,
            FeatureTag::Cyclic => families.cyclic = true,
            FeatureTag::Movable => families.movable = true,
            FeatureTag::Corner => families.corner = true,
        }
        families
    }
}

/// Decorate `path` into a level for `tag`.
pub(super) fn decorate(
    rng: &mut Prng,
    builder: &PathBuilder,
    path: Vec<usize>,
    tag: FeatureTag,
    config: &GeneratorConfig,
) -> Result<Decorated, GenerateErrorKind> {
    let (rows, cols) = (builder.rows(), builder.cols());
    let mut level = Level::filled(rows, cols, Cell::Wall);
    let mut on_path = vec![false; rows * cols];
    for &c in &path {
        level.set(c, Cell::Empty);
        on_path[c] = true;
    }

    let families = Families::choose(rng, tag);
    debug!(?tag, ?families, len = path.len(), "decorating path");

    let mut decorator = Decorator {
        rng,
        tag,
        config,
        level,
        order: vec![None; rows * cols],
        stitched: vec![false; rows * cols],
        path,
        on_path,
        obstacles: Vec::new(),
    };
    decorator.reindex();

    if families.stitch {
        decorator.inject_stitches()?;
    }
    if families.cyclic {
        decorator.inject_chain()?;
    }
    if families.hints {
        decorator.inject_hints()?;
    }
    if families.corner {
        decorator.inject_corners()?;
    }
    if families.movable {
        decorator.inject_movable()?;
    }
    decorator.balance()?;
    Ok(decorator.finish())
}

struct Decorator<'a> {
    rng: &'a mut Prng,
    tag: FeatureTag,
    config: &'a GeneratorConfig,
    level: Level,
    path: Vec<usize>,
    on_path: Vec<bool>,
    order: Vec<Option<usize>>,
    /// Cells belonging to a stitch block
    stitched: Vec<bool>,
    /// Solved movable-wall positions
    obstacles: Vec<usize>,
}

impl Decorator<'_> {
    fn reindex(&mut self) {
        self.order.iter_mut().for_each(|o| *o = None);
        for (k, &c) in self.path.iter().enumerate() {
            self.order[c] = Some(k);
        }
    }

    fn pos(&self, idx: usize) -> Position {
        self.level.position(idx)
    }

    fn orthogonal(&self, a: usize, b: usize) -> bool {
        Direction::between(self.pos(a), self.pos(b)).is_some()
    }

    fn linked(&self, a: usize, b: usize) -> bool {
        match (self.order[a], self.order[b]) {
            (Some(i), Some(j)) => i.abs_diff(j) == 1,
            _ => false,
        }
    }

    // ==================== Stitches ====================

    /// Start offsets of U-shaped runs `a b c d` around a 2x2 block with no stitched cell
    fn u_runs(&self) -> Vec<usize> {
        let path = &self.path;
        (0..path.len().saturating_sub(3))
            .filter(|&i| {
                let run = &path[i..i + 4];
                run.iter().all(|&c| !self.stitched[c])
                    && run.windows(2).all(|w| self.orthogonal(w[0], w[1]))
                    && self.orthogonal(run[0], run[3])
            })
            .collect()
    }

    /// Rewire `a b c d` into the crossing `a c b d`, which uses both block diagonals.
    fn rewire(&mut self, i: usize) {
        let run = [self.path[i], self.path[i + 1], self.path[i + 2], self.path[i + 3]];
        self.path.swap(i + 1, i + 2);
        let top = run.iter().map(|&c| c / self.level.cols()).min().unwrap_or(0);
        let left = run.iter().map(|&c| c % self.level.cols()).min().unwrap_or(0);
        for c in run {
            self.stitched[c] = true;
        }
        self.level.push_stitch(Vertex::new(top + 1, left + 1));
        self.reindex();
    }

    fn inject_stitches(&mut self) -> Result<(), GenerateErrorKind> {
        let wanted = if self.tag == FeatureTag::Stitch && self.path.len() >= 28 {
            1 + self.rng.next_int(2)
        } else {
            1
        };
        for _ in 0..wanted {
            let runs = self.u_runs();
            let Some(&i) = self.rng.pick(&runs) else {
                break;
            };
            self.rewire(i);
        }
        if self.tag == FeatureTag::Stitch && self.level.stitches().is_empty() {
            return Err(GenerateErrorKind::FeatureUnsatisfied(FeatureTag::Stitch));
        }
        Ok(())
    }

    // ==================== Cyclic chain ====================

    fn inject_chain(&mut self) -> Result<(), GenerateErrorKind> {
        let wanted = if self.tag == FeatureTag::Cyclic {
            2 + self.rng.next_int(3)
        } else {
            2 + self.rng.next_int(2)
        };
        let mut eligible: Vec<usize> = self
            .path
            .iter()
            .copied()
            .filter(|&c| self.level.cell(c) == Cell::Empty)
            .collect();
        // a single token carries no ordering information
        if eligible.len() < 2 {
            if self.tag == FeatureTag::Cyclic {
                return Err(GenerateErrorKind::FeatureUnsatisfied(FeatureTag::Cyclic));
            }
            return Ok(());
        }
        self.rng.shuffle(&mut eligible);
        eligible.truncate(wanted);
        eligible.sort_by_key(|&c| self.order[c]);

        let start = Token::ALL[self.rng.next_int(3)];
        let step = 1 + self.rng.next_int(2) as u8;
        for (k, &c) in eligible.iter().enumerate() {
            self.level.set(c, Cell::Token(start.rotate(step * k as u8)));
        }
        Ok(())
    }

    /// Token cells in path order
    fn chain(&self) -> Vec<usize> {
        self.path
            .iter()
            .copied()
            .filter(|&c| self.level.cell(c).token().is_some())
            .collect()
    }

    // ==================== Hints ====================

    /// Interior plain path cells entered and left orthogonally, with their neighbor directions
    fn hint_candidates(&self) -> Vec<(usize, Direction, Direction)> {
        let mut out = Vec::new();
        for k in 1..self.path.len().saturating_sub(1) {
            let c = self.path[k];
            if self.level.cell(c) != Cell::Empty || self.stitched[c] {
                continue;
            }
            let here = self.pos(c);
            let prev = Direction::between(here, self.pos(self.path[k - 1]));
            let next = Direction::between(here, self.pos(self.path[k + 1]));
            if let (Some(a), Some(b)) = (prev, next) {
                out.push((c, a, b));
            }
        }
        out
    }

    fn hint_kind(&mut self, a: Direction, b: Direction) -> HintKind {
        if a == b.opposite() {
            if self.rng.chance(0.5) {
                HintKind::Straight
            } else if a.is_horizontal() {
                HintKind::Horizontal
            } else {
                HintKind::Vertical
            }
        } else if self.rng.chance(0.5) {
            HintKind::Turn
        } else {
            turn_class(a, b).unwrap_or(HintKind::Turn)
        }
    }

    fn place_hint(&mut self) -> bool {
        let candidates = self.hint_candidates();
        let Some(&(c, a, b)) = self.rng.pick(&candidates) else {
            return false;
        };
        let kind = self.hint_kind(a, b);
        self.level.set(c, Cell::Hint(kind));
        true
    }

    fn inject_hints(&mut self) -> Result<(), GenerateErrorKind> {
        let wanted = if self.tag == FeatureTag::Hints {
            2 + self.rng.next_int(2)
        } else {
            1 + self.rng.next_int(2)
        };
        let mut placed = 0;
        for _ in 0..wanted {
            if self.place_hint() {
                placed += 1;
            }
        }
        if self.tag == FeatureTag::Hints && placed < 2 {
            return Err(GenerateErrorKind::FeatureUnsatisfied(FeatureTag::Hints));
        }
        Ok(())
    }

    // ==================== Corner clues ====================

    /// Orthogonal witness steps around `v`
    fn witness_corner_count(&self, v: Vertex) -> u8 {
        block_edges(&self.level, v)
            .iter()
            .filter(|&&(a, b)| self.linked(a, b))
            .count() as u8
    }

    /// Whether fixed-wall geometry around `v` can realize `count`
    fn achievable(&self, v: Vertex, count: u8) -> bool {
        let wall = |c: usize| self.level.cell(c) == Cell::Wall;
        let open_edges = block_edges(&self.level, v)
            .iter()
            .filter(|&&(a, b)| !wall(a) && !wall(b))
            .count()
            .min(MAX_CORNER_COUNT as usize);
        if count as usize > open_edges {
            return false;
        }
        let [tl, tr, bl, br] = self.level.block_cells(v);
        if count == 0 && (wall(tl) || wall(br)) && (wall(tr) || wall(bl)) {
            return false;
        }
        true
    }

    fn corner_candidates(&self) -> Vec<CornerClue> {
        let taken = |v: Vertex| {
            self.level.stitches().contains(&v) || self.level.corners().iter().any(|c| c.vertex == v)
        };
        self.level
            .interior_vertices()
            .into_iter()
            .filter(|&v| !taken(v))
            .filter_map(|v| {
                let count = self.witness_corner_count(v);
                self.achievable(v, count)
                    .then_some(CornerClue { vertex: v, count })
            })
            .collect()
    }

    fn place_corner(&mut self) -> bool {
        let candidates = self.corner_candidates();
        let Some(&clue) = self.rng.pick(&candidates) else {
            return false;
        };
        self.level.push_corner(clue);
        true
    }

    fn inject_corners(&mut self) -> Result<(), GenerateErrorKind> {
        let wanted = if self.tag == FeatureTag::Corner {
            1 + self.rng.next_int(2)
        } else {
            1
        };
        for _ in 0..wanted {
            if !self.place_corner() {
                break;
            }
        }
        if self.tag == FeatureTag::Corner && self.level.corners().is_empty() {
            return Err(GenerateErrorKind::NoCornerVertex);
        }
        Ok(())
    }

    // ==================== Movable walls ====================

    /// Convert off-path walls next to the path into movable walls, then scramble each
    /// one onto a plain path cell. The solved positions become open cells.
    fn inject_movable(&mut self) -> Result<(), GenerateErrorKind> {
        let wanted = if self.tag == FeatureTag::Movable {
            1 + self.rng.next_int(2)
        } else {
            1
        };
        let mut solved: Vec<usize> = (0..self.level.cell_count())
            .filter(|&c| {
                !self.on_path[c]
                    && self.level.cell(c) == Cell::Wall
                    && self.level.neighbors4(c).any(|m| self.on_path[m])
            })
            .collect();
        let mut targets: Vec<usize> = self
            .path
            .iter()
            .copied()
            .filter(|&c| self.level.cell(c) == Cell::Empty && !self.stitched[c])
            .collect();
        if solved.len() < wanted || targets.len() < wanted {
            if self.tag == FeatureTag::Movable {
                return Err(GenerateErrorKind::ScrambleImpossible);
            }
            return Ok(());
        }
        self.rng.shuffle(&mut solved);
        self.rng.shuffle(&mut targets);
        for (&home, &decoy) in solved.iter().zip(&targets).take(wanted) {
            self.level.set(home, Cell::Empty);
            self.level.set(decoy, Cell::MovableWall);
            self.obstacles.push(home);
        }
        self.obstacles.sort_unstable();
        Ok(())
    }

    // ==================== Density balancing ====================

    fn hint_min(&self) -> usize {
        if self.tag == FeatureTag::Hints {
            2
        } else {
            0
        }
    }

    fn corner_min(&self) -> usize {
        usize::from(self.tag == FeatureTag::Corner)
    }

    /// Remove one decoration above its family minimum
    fn remove_one(&mut self) -> bool {
        let hints: Vec<usize> = self
            .path
            .iter()
            .copied()
            .filter(|&c| self.level.cell(c).is_hint())
            .collect();
        if hints.len() > self.hint_min() {
            if let Some(&c) = self.rng.pick(&hints) {
                self.level.set(c, Cell::Empty);
                return true;
            }
        }

        if self.level.corners().len() > self.corner_min() {
            let vertices: Vec<Vertex> = self.level.corners().iter().map(|c| c.vertex).collect();
            if let Some(&v) = self.rng.pick(&vertices) {
                return self.level.remove_corner(v);
            }
        }

        // only chain ends can go without breaking the order of the rest
        let chain = self.chain();
        if chain.len() > 2 {
            let end = if self.rng.chance(0.5) {
                chain[0]
            } else {
                chain[chain.len() - 1]
            };
            self.level.set(end, Cell::Empty);
            return true;
        }
        false
    }

    fn balance(&mut self) -> Result<(), GenerateErrorKind> {
        let (lo, hi) = (self.config.density_min, self.config.density_max);
        for _ in 0..self.config.balance_iterations {
            let density = self.level.constraint_density();
            if density < lo - EPS {
                if !self.place_hint() && !self.place_corner() {
                    return Err(GenerateErrorKind::DensityNotConverged);
                }
            } else if density > hi + EPS {
                if !self.remove_one() {
                    return Err(GenerateErrorKind::DensityNotConverged);
                }
            } else {
                return Ok(());
            }
        }
        let density = self.level.constraint_density();
        if density >= lo - EPS && density <= hi + EPS {
            Ok(())
        } else {
            Err(GenerateErrorKind::DensityNotConverged)
        }
    }

    fn finish(self) -> Decorated {
        let witness = Witness {
            path: self.path.iter().map(|&c| self.level.position(c)).collect(),
            obstacles: self
                .obstacles
                .iter()
                .map(|&c| self.level.position(c))
                .collect(),
        };
        Decorated {
            level: self.level,
            witness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules;

    fn decorate_serpentine(tag: FeatureTag, seed: &str) -> Decorated {
        let builder = PathBuilder::new(5, 5);
        let built = builder.serpentine(22);
        let mut rng = Prng::from_seed_str(seed);
        decorate(&mut rng, &builder, built.cells, tag, &GeneratorConfig::catalog()).unwrap()
    }

    #[test]
    fn test_serpentine_accepts_every_tag() {
        for tag in FeatureTag::ROTATION {
            for seed in ["a", "b", "c"] {
                let decorated = decorate_serpentine(tag, seed);
                let eval = decorated.witness.replay(&decorated.level);
                assert!(eval.is_solved(), "{:?} {:?}", tag, eval.violations);
                let density = decorated.level.constraint_density();
                assert!((0.15 - EPS..=0.25 + EPS).contains(&density));
            }
        }
    }

    #[test]
    fn test_stitch_rewire_keeps_cells() {
        let decorated = decorate_serpentine(FeatureTag::Stitch, "stitch");
        let level = &decorated.level;
        assert!(!level.stitches().is_empty());
        assert_eq!(decorated.witness.path.len(), 22);
        let mut cells: Vec<Position> = decorated.witness.path.clone();
        cells.sort();
        cells.dedup();
        assert_eq!(cells.len(), 22);
    }

    #[test]
    fn test_chain_has_at_least_two_tokens() {
        for seed in ["x", "y", "z"] {
            let decorated = decorate_serpentine(FeatureTag::Cyclic, seed);
            assert!(decorated.level.token_count() >= 2);
        }
    }

    #[test]
    fn test_movable_solution_differs_from_display() {
        let decorated = decorate_serpentine(FeatureTag::Movable, "move");
        let level = &decorated.level;
        assert!(level.movable_count() >= 1);
        for pos in &decorated.witness.obstacles {
            assert_eq!(level.get(*pos), Cell::Empty);
        }
        // the displayed position must not already be the solved one
        let shown = rules::evaluate(level, &[], &decorated.witness.path);
        assert!(!shown.is_solved());
    }

    #[test]
    fn test_corner_geometry_rules() {
        let mut rng = Prng::from_seed_str("corner");
        let config = GeneratorConfig::catalog();
        let level = Level::from_rows(&["#..", "#..", "..."]).unwrap();
        let decorator = Decorator {
            rng: &mut rng,
            tag: FeatureTag::Corner,
            config: &config,
            level,
            path: vec![1, 2, 5, 4, 7, 6, 8],
            on_path: vec![false; 9],
            order: vec![None; 9],
            stitched: vec![false; 9],
            obstacles: Vec::new(),
        };
        // (1,1): tl and bl walls, so only edges tr-br (1-4) are open and at most 1 is possible
        assert!(decorator.achievable(Vertex::new(1, 1), 1));
        assert!(!decorator.achievable(Vertex::new(1, 1), 2));
        // zero with both diagonals blocked
        assert!(!decorator.achievable(Vertex::new(1, 1), 0));
        // (2,2): no walls, any count up to 3
        assert!(decorator.achievable(Vertex::new(2, 2), 3));
        assert!(decorator.achievable(Vertex::new(2, 2), 0));
    }
}
