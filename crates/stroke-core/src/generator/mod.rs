//! Deterministic level generation.
//!
//! A level is a pure function of `(seed_context, index, variant)`: the three are
//! hashed into the [`Prng`] seed and every stochastic decision draws from that one
//! stream. Generation builds a covering path ([`path`]), decorates it with
//! constraints and balances their density ([`features`]), then replays the resulting
//! [`Witness`] through rule evaluation before handing the level out.

mod features;
pub mod path;

use crate::level::{Level, Position};
use crate::rng::Prng;
use crate::rules::{self, Evaluation};
use path::PathBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// The feature family a level is built around
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureTag {
    /// Diagonal stitch crossings
    Stitch,
    /// Shape hints
    Hints,
    /// Cyclic-order token chain
    Cyclic,
    /// Relocatable obstacles
    Movable,
    /// Vertex connection-count clues
    Corner,
}

impl FeatureTag {
    /// Tag rotation used by index-driven generation
    pub const ROTATION: [FeatureTag; 5] = [
        FeatureTag::Stitch,
        FeatureTag::Hints,
        FeatureTag::Cyclic,
        FeatureTag::Movable,
        FeatureTag::Corner,
    ];

    /// Path fill ratio range (fraction of the grid the path covers)
    pub fn fill_ratio(self) -> (f64, f64) {
        match self {
            FeatureTag::Stitch => (0.80, 0.92),
            FeatureTag::Hints => (0.72, 0.90),
            FeatureTag::Cyclic => (0.72, 0.90),
            FeatureTag::Movable => (0.68, 0.82),
            FeatureTag::Corner => (0.72, 0.88),
        }
    }
}

impl fmt::Display for FeatureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureTag::Stitch => write!(f, "stitch"),
            FeatureTag::Hints => write!(f, "hints"),
            FeatureTag::Cyclic => write!(f, "cyclic"),
            FeatureTag::Movable => write!(f, "movable"),
            FeatureTag::Corner => write!(f, "corner"),
        }
    }
}

/// Configuration for level generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Global seed string mixed into every level seed
    pub seed_context: String,
    /// Closed constraint-density band
    pub density_min: f64,
    pub density_max: f64,
    /// Ceiling on obstacles / total cells
    pub max_obstacle_density: f64,
    /// Whole-level attempts before reporting failure (the last uses the serpentine path)
    pub max_attempts: usize,
    /// Bound on the density balancing loop
    pub balance_iterations: usize,
    /// Randomized path searches per attempt
    pub path_attempts: usize,
    /// Explored nodes per path search
    pub path_node_budget: usize,
    /// Grid sizes cycled by index
    pub sizes: Vec<(usize, usize)>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::catalog()
    }
}

impl GeneratorConfig {
    /// Infinite catalog generator
    pub fn catalog() -> Self {
        Self {
            seed_context: "stroke-catalog-v1".to_string(),
            density_min: 0.15,
            density_max: 0.25,
            max_obstacle_density: 0.40,
            max_attempts: 12,
            balance_iterations: 48,
            path_attempts: 24,
            path_node_budget: 5_000,
            sizes: vec![(5, 5), (5, 6), (6, 5), (6, 6)],
        }
    }

    /// Daily pool generator; same rules, separate seed space
    pub fn daily() -> Self {
        Self {
            seed_context: "stroke-daily-v1".to_string(),
            ..Self::catalog()
        }
    }

    pub fn with_seed_context(mut self, seed_context: impl Into<String>) -> Self {
        self.seed_context = seed_context.into();
        self
    }
}

/// Explicit generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub index: u32,
    pub variant: u32,
    pub rows: usize,
    pub cols: usize,
    pub tag: FeatureTag,
}

/// The generator's own solution, kept so solvability can be re-verified by replay
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Witness {
    /// Visited cells in order
    pub path: Vec<Position>,
    /// Solved movable-wall positions
    pub obstacles: Vec<Position>,
}

impl Witness {
    /// Replay this witness through rule evaluation
    pub fn replay(&self, level: &Level) -> Evaluation {
        rules::evaluate(level, &self.obstacles, &self.path)
    }
}

/// A generated level with its provenance and witness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedLevel {
    pub index: u32,
    pub variant: u32,
    pub tag: FeatureTag,
    pub level: Level,
    pub witness: Witness,
    /// Whether the serpentine fallback path was used
    pub fallback_path: bool,
}

impl GeneratedLevel {
    pub fn replay(&self) -> Evaluation {
        self.witness.replay(&self.level)
    }
}

/// Why a generation attempt failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateErrorKind {
    #[error("grid size {rows}x{cols} is outside the supported range")]
    InvalidSize { rows: usize, cols: usize },
    #[error("no path admits the required {0} feature")]
    FeatureUnsatisfied(FeatureTag),
    #[error("constraint density did not converge into the band")]
    DensityNotConverged,
    #[error("relocatable obstacles could not be scrambled")]
    ScrambleImpossible,
    #[error("no non-colliding vertex for a required corner clue")]
    NoCornerVertex,
    #[error("obstacle density {0:.3} exceeds the ceiling")]
    ObstacleDensity(f64),
    #[error("witness replay failed")]
    WitnessRejected,
}

/// Generation failure tagged with the (index, variant) it belongs to
#[derive(Debug, Clone, PartialEq, Error)]
#[error("generation failed for index {index} variant {variant}: {kind}")]
pub struct GenerateError {
    pub index: u32,
    pub variant: u32,
    pub kind: GenerateErrorKind,
}

/// Smallest and largest supported grid side
pub const MIN_SIDE: usize = 3;
pub const MAX_SIDE: usize = 8;

/// Puzzle level generator
#[derive(Debug, Clone, Default)]
pub struct LevelGenerator {
    config: GeneratorConfig,
}

impl LevelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Size and tag for a catalog index
    pub fn request_for(&self, index: u32, variant: u32) -> GenerateRequest {
        let tags = FeatureTag::ROTATION.len() as u32;
        let tag = FeatureTag::ROTATION[(index % tags) as usize];
        let (rows, cols) = if self.config.sizes.is_empty() {
            (5, 5)
        } else {
            self.config.sizes[((index / tags) as usize) % self.config.sizes.len()]
        };
        GenerateRequest {
            index,
            variant,
            rows,
            cols,
            tag,
        }
    }

    /// Generate the level for `(index, variant)`.
    pub fn generate(&self, index: u32, variant: u32) -> Result<GeneratedLevel, GenerateError> {
        self.generate_with(self.request_for(index, variant))
    }

    /// Generate a level for an explicit request.
    pub fn generate_with(&self, req: GenerateRequest) -> Result<GeneratedLevel, GenerateError> {
        let fail = |kind| GenerateError {
            index: req.index,
            variant: req.variant,
            kind,
        };
        if !(MIN_SIDE..=MAX_SIDE).contains(&req.rows) || !(MIN_SIDE..=MAX_SIDE).contains(&req.cols) {
            return Err(fail(GenerateErrorKind::InvalidSize {
                rows: req.rows,
                cols: req.cols,
            }));
        }

        let seed = format!("{}:{}:{}", self.config.seed_context, req.index, req.variant);
        let mut rng = Prng::from_seed_str(&seed);
        let builder = PathBuilder::new(req.rows, req.cols)
            .with_budget(self.config.path_attempts, self.config.path_node_budget);

        let mut last = GenerateErrorKind::DensityNotConverged;
        for attempt in 0..self.config.max_attempts.max(1) {
            let force_fallback = attempt + 1 == self.config.max_attempts.max(1);
            let target = target_length(&mut rng, req.rows, req.cols, req.tag);
            let built = if force_fallback {
                builder.serpentine(target)
            } else {
                builder.build(&mut rng, target)
            };

            let decorated =
                match features::decorate(&mut rng, &builder, built.cells, req.tag, &self.config) {
                    Ok(d) => d,
                    Err(kind) => {
                        debug!(index = req.index, variant = req.variant, attempt, %kind, "attempt rejected");
                        last = kind;
                        continue;
                    }
                };

            let obstacle_density = decorated.level.obstacle_density();
            if obstacle_density > self.config.max_obstacle_density + 1e-9 {
                last = GenerateErrorKind::ObstacleDensity(obstacle_density);
                continue;
            }

            let generated = GeneratedLevel {
                index: req.index,
                variant: req.variant,
                tag: req.tag,
                level: decorated.level,
                witness: decorated.witness,
                fallback_path: built.fallback,
            };
            if !generated.replay().is_solved() {
                warn!(index = req.index, variant = req.variant, "generated witness failed replay");
                last = GenerateErrorKind::WitnessRejected;
                continue;
            }
            debug!(
                index = req.index,
                variant = req.variant,
                attempt,
                density = generated.level.constraint_density(),
                "level generated"
            );
            return Ok(generated);
        }
        Err(fail(last))
    }
}

/// Target path length for a tag: a fill ratio of the grid, clamped so the path can
/// still touch every row and column.
fn target_length(rng: &mut Prng, rows: usize, cols: usize, tag: FeatureTag) -> usize {
    let n = rows * cols;
    let (lo, hi) = tag.fill_ratio();
    let ratio = lo + rng.next_f64() * (hi - lo);
    let mut target = (ratio * n as f64).round() as usize;
    if tag == FeatureTag::Movable {
        target = target.min(n - 1);
    }
    target.clamp(rows + cols - 1, n)
}
