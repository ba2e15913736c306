//! Basic example of using the stroke puzzle engine

use std::collections::HashSet;
use std::time::Duration;
use stroke_core::overrides::build_overrides;
use stroke_core::{
    canonical_fingerprint, DailyScheduler, DifficultySampler, LevelGenerator, SchedulerConfig,
    SolveOptions, Solver,
};

fn main() {
    // Generate a catalog level
    let generator = LevelGenerator::new();
    let generated = match generator.generate(7, 0) {
        Ok(g) => g,
        Err(err) => {
            eprintln!("{}", err);
            return;
        }
    };
    println!("Level 7 ({} feature, {}x{}):", generated.tag, generated.level.rows(), generated.level.cols());
    println!("{}", generated.level);
    println!("Constraint density: {:.3}", generated.level.constraint_density());
    println!("Witness replays: {}\n", generated.replay().is_solved());

    // Fingerprint it
    let fingerprint = canonical_fingerprint(&generated.level);
    println!("Canonical signature: {}", fingerprint.signature);
    println!("Canonical key: {}\n", fingerprint.key);

    // Count its solutions
    let solver = Solver::new();
    let report = solver.solve(&generated.level, &SolveOptions::uniqueness().with_time_budget(Duration::from_secs(2)));
    println!(
        "Solutions: {} raw, {} up to reversal{}",
        report.raw_solutions,
        report.canonical_solutions,
        if report.timed_out { " (partial)" } else { "" }
    );

    // Rate the difficulty
    let stats = DifficultySampler::new().sample(&generated.level);
    println!(
        "Difficulty: mean {:.1} backtracks, p90 {:.1}\n",
        stats.mean_backtracks, stats.p90_backtracks
    );

    // Scan a small catalog range for canonical duplicates
    let scan = match build_overrides(&generator, 0..20, 16) {
        Ok(scan) => scan,
        Err(err) => {
            eprintln!("{}", err);
            return;
        }
    };
    println!("Catalog 0..20: {} overrides", scan.overrides.len());

    // Publish the first day of a tiny daily pool
    let scheduler = DailyScheduler::new(SchedulerConfig::new("demo-secret").with_slot_count(7));
    match scheduler.slot_for_date(scheduler.config().epoch) {
        Ok(slot) => println!("Epoch day maps to daily slot {}", slot),
        Err(err) => eprintln!("{}", err),
    }
    match scheduler.select_candidate_for_slot(0, &scan.keys, &HashSet::new(), 8) {
        Ok(candidate) => println!(
            "Slot 0 accepts variant {} (key {})",
            candidate.variant, candidate.key
        ),
        Err(err) => eprintln!("{}", err),
    }
}
