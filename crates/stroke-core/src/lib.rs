//! Single-stroke path puzzle engine
//!
//! Procedural generation of path puzzles on small grids, canonical fingerprints
//! that identify levels up to symmetry, an exhaustive solver, difficulty sampling,
//! and the daily slot scheduler with its override and history artifacts.
//!
//! Every level is a pure function of `(seed context, index, variant)`.

pub mod board;
pub mod canonical;
pub mod difficulty;
pub mod generator;
pub mod level;
pub mod overrides;
pub mod rng;
pub mod rules;
pub mod schedule;
pub mod service;
pub mod solver;

pub use canonical::{canonical_fingerprint, canonical_key, canonical_signature, CanonicalKey, Fingerprint};
pub use difficulty::{DifficultySampler, DifficultyStats, SamplerConfig};
pub use generator::{
    FeatureTag, GenerateError, GenerateErrorKind, GenerateRequest, GeneratedLevel, GeneratorConfig,
    LevelGenerator, Witness,
};
pub use level::{Cell, CornerClue, HintKind, Level, LevelDocument, LevelError, Position, Token, Vertex};
pub use overrides::{CodecError, OverrideTable};
pub use rng::Prng;
pub use rules::{evaluate, Evaluation, Violation};
pub use schedule::{DailyScheduler, ScheduleError, SchedulerConfig};
pub use service::LevelService;
pub use solver::{SolveOptions, SolveReport, Solver};
