//! Daily slot scheduling.
//!
//! The daily pool is a fixed set of `slot_count` slots. Each slot is a daily-seeded
//! catalog index whose variant is probed until its canonical key is new to both the
//! infinite catalog and the slots accepted before it. Days map to slots through a
//! secret-keyed permutation ([`permutation`]) so the order cannot be predicted, and
//! every publication is checked against the [`history`] ledger.

pub mod history;
pub mod manifest;
pub mod permutation;

use crate::canonical::{canonical_key, CanonicalKey};
use crate::difficulty::{DifficultySampler, SamplerConfig};
use crate::generator::{GenerateError, GeneratedLevel, GeneratorConfig, LevelGenerator};
use crate::level::Level;
use crate::overrides::{CodecError, OverrideTable};
use crate::rng::seed_state;
use history::{DailyHistory, HistoryEntry, HistoryError};
use manifest::{
    pool_digest, ArtifactMeta, PoolManifest, PoolRecord, TodayPayload, MANIFEST_SCHEMA_VERSION,
    TODAY_SCHEMA_VERSION,
};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use time::macros::{date, format_description};
use time::Date;
use tracing::{debug, info, warn};

pub use permutation::slot_permutation;

/// Distribution name of the compressed override table
pub const OVERRIDES_ARTIFACT: &str = "daily-overrides.bin.gz";
/// Distribution name of the slot records
pub const RECORDS_ARTIFACT: &str = "daily-pool.json";

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("STROKE_DAILY_SECRET is not set")]
    MissingSecret,
    #[error("secret cannot key HMAC-SHA256")]
    InvalidSecret,
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("date formatting failed: {0}")]
    DateFormat(#[from] time::error::Format),
    #[error("{date} is before the pool epoch {epoch}")]
    BeforeEpoch { date: Date, epoch: Date },
    #[error("day {ordinal} is beyond the {slot_count}-slot pool")]
    PoolExhausted { ordinal: i64, slot_count: u32 },
    #[error("slot {slot} is outside the {slot_count}-slot pool")]
    SlotOutOfRange { slot: u32, slot_count: u32 },
    #[error("slot {slot}: no acceptable variant within {probed} probes")]
    ProbeExhausted { slot: u32, probed: u32 },
    #[error("slot {slot} variant {variant}: witness does not replay")]
    WitnessRejected { slot: u32, variant: u32 },
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn format_date(date: Date) -> Result<String, ScheduleError> {
    Ok(date.format(format_description!("[year]-[month]-[day]"))?)
}

pub fn parse_date(s: &str) -> Result<Date, ScheduleError> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ScheduleError::InvalidDate(s.to_string()))
}

/// Unix milliseconds of the UTC midnight that ends `date`
pub fn next_utc_midnight_ms(date: Date) -> Result<i64, ScheduleError> {
    let next = date
        .next_day()
        .ok_or_else(|| ScheduleError::InvalidDate(date.to_string()))?;
    Ok(next.midnight().assume_utc().unix_timestamp() * 1000)
}

// ==================== Configuration ====================

/// Scheduler settings
#[derive(Clone, PartialEq)]
pub struct SchedulerConfig {
    /// HMAC key for the day→slot permutation
    pub secret: Vec<u8>,
    /// Day with ordinal 0
    pub epoch: Date,
    pub slot_count: u32,
    /// Permutation context string
    pub context: String,
    pub pool_version: String,
    /// First variant probed for every slot
    pub base_variant: u32,
    pub max_variant_probe: u32,
    /// Leading probes compared by difficulty; later probes take the first acceptable
    pub difficulty_window: u32,
    pub sampler: SamplerConfig,
}

impl fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("secret", &"<redacted>")
            .field("epoch", &self.epoch)
            .field("slot_count", &self.slot_count)
            .field("context", &self.context)
            .field("pool_version", &self.pool_version)
            .field("base_variant", &self.base_variant)
            .field("max_variant_probe", &self.max_variant_probe)
            .field("difficulty_window", &self.difficulty_window)
            .finish()
    }
}

impl SchedulerConfig {
    pub const SECRET_VAR: &'static str = "STROKE_DAILY_SECRET";
    pub const EPOCH_VAR: &'static str = "STROKE_DAILY_EPOCH";
    pub const POOL_VERSION_VAR: &'static str = "STROKE_POOL_VERSION";

    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            epoch: date!(2025 - 01 - 01),
            slot_count: 3650,
            context: "stroke-daily-slots-v1".to_string(),
            pool_version: "pool-v1".to_string(),
            base_variant: 0,
            max_variant_probe: 32,
            difficulty_window: 4,
            sampler: SamplerConfig::deterministic(),
        }
    }

    pub fn with_slot_count(mut self, slot_count: u32) -> Self {
        self.slot_count = slot_count;
        self
    }

    /// Read the secret (required), epoch and pool version from the environment.
    pub fn from_env() -> Result<Self, ScheduleError> {
        let secret = match std::env::var(Self::SECRET_VAR) {
            Ok(s) if !s.is_empty() => s,
            _ => return Err(ScheduleError::MissingSecret),
        };
        let mut config = Self::new(secret);
        if let Ok(epoch) = std::env::var(Self::EPOCH_VAR) {
            config.epoch = parse_date(&epoch)?;
        }
        if let Ok(version) = std::env::var(Self::POOL_VERSION_VAR) {
            config.pool_version = version;
        }
        Ok(config)
    }
}

// ==================== Candidates ====================

/// Accepted level for a slot
#[derive(Debug, Clone)]
pub struct Candidate {
    pub slot: u32,
    pub variant: u32,
    pub key: CanonicalKey,
    /// Difficulty score, present when chosen inside the difficulty window
    pub score: Option<f64>,
    pub generated: GeneratedLevel,
}

/// Built pool plus its distribution artifacts
#[derive(Debug, Clone)]
pub struct DailyPool {
    pub records: Vec<PoolRecord>,
    pub overrides: OverrideTable,
    /// Gzip-wrapped override table
    pub overrides_bin: Vec<u8>,
    pub manifest: PoolManifest,
}

/// Outcome of rebuilding a pool and comparing it to shipped artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolVerification {
    pub slots: usize,
    pub digest: String,
    pub problems: Vec<String>,
}

impl PoolVerification {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Daily scheduler over the daily-seeded generator
#[derive(Debug, Clone)]
pub struct DailyScheduler {
    config: SchedulerConfig,
    generator: LevelGenerator,
}

impl DailyScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_generator(config, LevelGenerator::with_config(GeneratorConfig::daily()))
    }

    pub fn with_generator(config: SchedulerConfig, generator: LevelGenerator) -> Self {
        Self { config, generator }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn generator(&self) -> &LevelGenerator {
        &self.generator
    }

    /// Day ordinal → slot
    pub fn permutation(&self) -> Result<Vec<u32>, ScheduleError> {
        slot_permutation(&self.config.secret, self.config.slot_count, &self.config.context)
    }

    /// Days since the epoch, bounded by the slot count
    pub fn ordinal_for(&self, date: Date) -> Result<u32, ScheduleError> {
        let epoch = self.config.epoch;
        if date < epoch {
            return Err(ScheduleError::BeforeEpoch { date, epoch });
        }
        let ordinal = (date - epoch).whole_days();
        if ordinal >= self.config.slot_count as i64 {
            return Err(ScheduleError::PoolExhausted {
                ordinal,
                slot_count: self.config.slot_count,
            });
        }
        Ok(ordinal as u32)
    }

    pub fn slot_for_date(&self, date: Date) -> Result<u32, ScheduleError> {
        let ordinal = self.ordinal_for(date)?;
        self.permutation()?
            .get(ordinal as usize)
            .copied()
            .ok_or(ScheduleError::PoolExhausted {
                ordinal: ordinal as i64,
                slot_count: self.config.slot_count,
            })
    }

    /// Difficulty score seeded by slot and variant so repeated runs agree
    fn score(&self, slot: u32, variant: u32, level: &Level) -> f64 {
        let seed = seed_state(&format!("{}:{}:{}", self.config.context, slot, variant));
        DifficultySampler::with_seed(seed)
            .with_config(self.config.sampler.clone())
            .sample(level)
            .score()
    }

    /// Probe variants for `slot`, rejecting generation failures, canonical collisions
    /// with either key set, and witnesses that do not replay. Inside the difficulty
    /// window the hardest acceptable variant wins (ties go to the lower variant);
    /// past it the first acceptable variant is taken.
    pub fn select_candidate_for_slot(
        &self,
        slot: u32,
        infinite_keys: &HashSet<CanonicalKey>,
        daily_keys: &HashSet<CanonicalKey>,
        max_variant_probe: u32,
    ) -> Result<Candidate, ScheduleError> {
        if slot >= self.config.slot_count {
            return Err(ScheduleError::SlotOutOfRange {
                slot,
                slot_count: self.config.slot_count,
            });
        }
        let mut best: Option<Candidate> = None;
        for offset in 0..max_variant_probe {
            let in_window = offset < self.config.difficulty_window;
            if !in_window && best.is_some() {
                break;
            }
            let Some(variant) = self.config.base_variant.checked_add(offset) else {
                break;
            };
            let generated = match self.generator.generate(slot, variant) {
                Ok(g) => g,
                Err(err) => {
                    debug!(%err, "daily variant skipped");
                    continue;
                }
            };
            let key = canonical_key(&generated.level);
            if infinite_keys.contains(&key) || daily_keys.contains(&key) {
                debug!(slot, variant, %key, "canonical collision");
                continue;
            }
            if !generated.replay().is_solved() {
                warn!(slot, variant, "witness failed replay");
                continue;
            }

            if !in_window {
                info!(slot, variant, %key, "candidate accepted past difficulty window");
                return Ok(Candidate {
                    slot,
                    variant,
                    key,
                    score: None,
                    generated,
                });
            }
            let score = self.score(slot, variant, &generated.level);
            debug!(slot, variant, score, "scored candidate");
            if best.as_ref().and_then(|b| b.score).map_or(true, |s| score > s) {
                best = Some(Candidate {
                    slot,
                    variant,
                    key,
                    score: Some(score),
                    generated,
                });
            }
        }

        let candidate = best.ok_or(ScheduleError::ProbeExhausted {
            slot,
            probed: max_variant_probe,
        })?;
        info!(slot, variant = candidate.variant, key = %candidate.key, "candidate accepted");
        Ok(candidate)
    }

    /// Accept candidates for every slot in order and package the artifacts.
    pub fn build_pool(
        &self,
        infinite_keys: &HashSet<CanonicalKey>,
    ) -> Result<DailyPool, ScheduleError> {
        let mut daily_keys = HashSet::new();
        let mut records = Vec::with_capacity(self.config.slot_count as usize);
        let mut overrides = OverrideTable::new();
        for slot in 0..self.config.slot_count {
            let candidate = self.select_candidate_for_slot(
                slot,
                infinite_keys,
                &daily_keys,
                self.config.max_variant_probe,
            )?;
            daily_keys.insert(candidate.key.clone());
            if candidate.variant != self.config.base_variant {
                overrides.insert(slot, candidate.variant);
            }
            records.push(PoolRecord {
                slot,
                variant: candidate.variant,
                canonical_key: candidate.key,
            });
        }

        let overrides_bin = overrides.to_compressed()?;
        let records_json = serde_json::to_vec(&records)?;
        let manifest = PoolManifest {
            schema_version: MANIFEST_SCHEMA_VERSION,
            pool_version: self.config.pool_version.clone(),
            epoch: format_date(self.config.epoch)?,
            slot_count: self.config.slot_count,
            base_variant: self.config.base_variant,
            max_variant_probe: self.config.max_variant_probe,
            digest: pool_digest(&records),
            artifacts: vec![
                ArtifactMeta {
                    name: OVERRIDES_ARTIFACT.to_string(),
                    bytes: overrides_bin.len() as u64,
                },
                ArtifactMeta {
                    name: RECORDS_ARTIFACT.to_string(),
                    bytes: records_json.len() as u64,
                },
            ],
        };
        info!(
            slots = records.len(),
            overrides = overrides.len(),
            digest = %manifest.digest,
            "daily pool built"
        );
        Ok(DailyPool {
            records,
            overrides,
            overrides_bin,
            manifest,
        })
    }

    /// Rebuild the pool and compare it with a shipped manifest and override table.
    pub fn verify_pool(
        &self,
        infinite_keys: &HashSet<CanonicalKey>,
        manifest: &PoolManifest,
        overrides_bytes: &[u8],
    ) -> Result<PoolVerification, ScheduleError> {
        let rebuilt = self.build_pool(infinite_keys)?;
        let expected = &rebuilt.manifest;
        let mut problems = Vec::new();

        let mut check = |field: &str, shipped: String, fresh: String| {
            if shipped != fresh {
                problems.push(format!("{}: manifest has {}, rebuild has {}", field, shipped, fresh));
            }
        };
        check(
            "schemaVersion",
            manifest.schema_version.to_string(),
            expected.schema_version.to_string(),
        );
        check("poolVersion", manifest.pool_version.clone(), expected.pool_version.clone());
        check("epoch", manifest.epoch.clone(), expected.epoch.clone());
        check("slotCount", manifest.slot_count.to_string(), expected.slot_count.to_string());
        check(
            "baseVariant",
            manifest.base_variant.to_string(),
            expected.base_variant.to_string(),
        );
        check(
            "maxVariantProbe",
            manifest.max_variant_probe.to_string(),
            expected.max_variant_probe.to_string(),
        );
        check("digest", manifest.digest.clone(), expected.digest.clone());

        for artifact in &expected.artifacts {
            match manifest.artifact(&artifact.name) {
                Some(shipped) if shipped.bytes == artifact.bytes => {}
                Some(shipped) => problems.push(format!(
                    "{}: manifest lists {} bytes, rebuild has {}",
                    artifact.name, shipped.bytes, artifact.bytes
                )),
                None => problems.push(format!("{}: missing from manifest", artifact.name)),
            }
        }

        let shipped = OverrideTable::from_bytes(overrides_bytes)?;
        if shipped != rebuilt.overrides {
            problems.push(format!(
                "overrides: shipped table has {} entries, rebuild has {}",
                shipped.len(),
                rebuilt.overrides.len()
            ));
        }

        if problems.is_empty() {
            info!(slots = rebuilt.records.len(), "daily pool verified");
        } else {
            warn!(problems = problems.len(), "daily pool verification failed");
        }
        Ok(PoolVerification {
            slots: rebuilt.records.len(),
            digest: expected.digest.clone(),
            problems,
        })
    }

    /// Publish the level for `date`: map it to a slot, regenerate the slot's level
    /// with its override variant, record it in the ledger and build the payload.
    pub fn publish_daily(
        &self,
        date: Date,
        now_utc_ms: i64,
        history: &mut DailyHistory,
        overrides: &OverrideTable,
    ) -> Result<TodayPayload, ScheduleError> {
        let daily_id = format_date(date)?;
        let slot = self.slot_for_date(date)?;
        let variant = overrides
            .variant_for(slot)
            .unwrap_or(self.config.base_variant);
        let generated = self.generator.generate(slot, variant)?;
        if !generated.replay().is_solved() {
            return Err(ScheduleError::WitnessRejected { slot, variant });
        }
        let key = canonical_key(&generated.level);

        let outcome = history.record(HistoryEntry {
            daily_id: daily_id.clone(),
            daily_slot: slot,
            canonical_key: key.clone(),
            pool_version: self.config.pool_version.clone(),
            published_at_utc_ms: now_utc_ms,
        })?;
        info!(%daily_id, slot, variant, ?outcome, "daily level published");

        Ok(TodayPayload {
            schema_version: TODAY_SCHEMA_VERSION,
            pool_version: self.config.pool_version.clone(),
            daily_id,
            daily_slot: slot,
            canonical_key: key,
            generated_at_utc_ms: now_utc_ms,
            hard_invalidate_at_utc_ms: next_utc_midnight_ms(date)?,
            level: generated.level.to_document(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> SchedulerConfig {
        let mut config = SchedulerConfig::new("test-secret").with_slot_count(4);
        config.max_variant_probe = 12;
        config.difficulty_window = 2;
        config.sampler = SamplerConfig {
            trials: 2,
            trial_budget: Duration::from_secs(30),
            node_limit: Some(5_000),
        };
        config
    }

    #[test]
    fn test_ordinals_and_bounds() {
        let scheduler = DailyScheduler::new(test_config());
        assert_eq!(scheduler.ordinal_for(date!(2025 - 01 - 01)).unwrap(), 0);
        assert_eq!(scheduler.ordinal_for(date!(2025 - 01 - 03)).unwrap(), 2);
        assert!(matches!(
            scheduler.ordinal_for(date!(2024 - 12 - 31)),
            Err(ScheduleError::BeforeEpoch { .. })
        ));
        assert!(matches!(
            scheduler.ordinal_for(date!(2025 - 01 - 05)),
            Err(ScheduleError::PoolExhausted { ordinal: 4, .. })
        ));
    }

    #[test]
    fn test_slot_mapping_is_a_permutation() {
        let scheduler = DailyScheduler::new(test_config());
        let mut slots: Vec<u32> = (0..4)
            .map(|d| {
                scheduler
                    .slot_for_date(date!(2025 - 01 - 01) + time::Duration::days(d))
                    .unwrap()
            })
            .collect();
        slots.sort_unstable();
        assert_eq!(slots, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_candidate_avoids_known_keys() {
        let scheduler = DailyScheduler::new(test_config());
        let none = HashSet::new();
        let first = scheduler.select_candidate_for_slot(0, &none, &none, 12).unwrap();
        assert!(first.variant < 2);
        assert!(first.score.is_some());
        assert!(first.generated.replay().is_solved());

        let taken: HashSet<CanonicalKey> = [first.key.clone()].into_iter().collect();
        let second = scheduler.select_candidate_for_slot(0, &taken, &none, 12).unwrap();
        assert_ne!(second.key, first.key);
        let third = scheduler.select_candidate_for_slot(0, &none, &taken, 12).unwrap();
        assert_ne!(third.key, first.key);
    }

    fn acceptable(scheduler: &DailyScheduler, slot: u32, variant: u32) -> Option<GeneratedLevel> {
        let generated = scheduler.generator().generate(slot, variant).ok()?;
        generated.replay().is_solved().then_some(generated)
    }

    #[test]
    fn test_window_picks_hardest_with_low_tie_break() {
        let mut config = test_config().with_slot_count(6);
        config.difficulty_window = 4;
        let scheduler = DailyScheduler::new(config);
        let none = HashSet::new();
        for slot in 0..6 {
            let mut expected: Option<(u32, f64)> = None;
            for variant in 0..4 {
                let Some(generated) = acceptable(&scheduler, slot, variant) else {
                    continue;
                };
                let score = scheduler.score(slot, variant, &generated.level);
                if expected.map_or(true, |(_, best)| score > best) {
                    expected = Some((variant, score));
                }
            }
            let (variant, score) = expected.unwrap();
            let chosen = scheduler.select_candidate_for_slot(slot, &none, &none, 12).unwrap();
            assert_eq!(chosen.variant, variant, "slot {}", slot);
            assert_eq!(chosen.score, Some(score));
        }
    }

    #[test]
    fn test_past_window_takes_first_acceptable() {
        let scheduler = DailyScheduler::new(test_config());
        let none = HashSet::new();
        let window: HashSet<CanonicalKey> = (0..2)
            .filter_map(|v| scheduler.generator().generate(2, v).ok())
            .map(|g| canonical_key(&g.level))
            .collect();
        let expected = (2..12)
            .find(|&v| {
                acceptable(&scheduler, 2, v)
                    .is_some_and(|g| !window.contains(&canonical_key(&g.level)))
            })
            .unwrap();
        let chosen = scheduler.select_candidate_for_slot(2, &window, &none, 12).unwrap();
        assert_eq!(chosen.variant, expected);
        assert_eq!(chosen.score, None);
    }

    #[test]
    fn test_probe_stops_at_variant_ceiling() {
        let mut config = test_config();
        config.base_variant = u32::MAX - 1;
        let scheduler = DailyScheduler::new(config);
        let none = HashSet::new();
        match scheduler.select_candidate_for_slot(0, &none, &none, 12) {
            Ok(candidate) => assert!(candidate.variant >= u32::MAX - 1),
            Err(err) => assert!(matches!(err, ScheduleError::ProbeExhausted { probed: 12, .. })),
        }
    }

    #[test]
    fn test_selection_is_deterministic() {
        let scheduler = DailyScheduler::new(test_config());
        let none = HashSet::new();
        let a = scheduler.select_candidate_for_slot(1, &none, &none, 12).unwrap();
        let b = scheduler.select_candidate_for_slot(1, &none, &none, 12).unwrap();
        assert_eq!(a.variant, b.variant);
        assert_eq!(a.key, b.key);
    }

    #[test]
    fn test_probe_exhaustion() {
        let scheduler = DailyScheduler::new(test_config());
        let none = HashSet::new();
        assert!(matches!(
            scheduler.select_candidate_for_slot(0, &none, &none, 0),
            Err(ScheduleError::ProbeExhausted { slot: 0, probed: 0 })
        ));
        assert!(matches!(
            scheduler.select_candidate_for_slot(9, &none, &none, 4),
            Err(ScheduleError::SlotOutOfRange { .. })
        ));
    }

    #[test]
    fn test_pool_build_and_verify() {
        let scheduler = DailyScheduler::new(test_config());
        let none = HashSet::new();
        let pool = scheduler.build_pool(&none).unwrap();
        assert_eq!(pool.records.len(), 4);
        let keys: HashSet<&CanonicalKey> = pool.records.iter().map(|r| &r.canonical_key).collect();
        assert_eq!(keys.len(), 4);

        let report = scheduler
            .verify_pool(&none, &pool.manifest, &pool.overrides_bin)
            .unwrap();
        assert!(report.is_ok(), "{:?}", report.problems);

        let mut tampered = pool.manifest.clone();
        tampered.digest = "0".repeat(64);
        tampered.artifacts.pop();
        let report = scheduler
            .verify_pool(&none, &tampered, &pool.overrides_bin)
            .unwrap();
        assert_eq!(report.problems.len(), 2);
    }

    #[test]
    fn test_publish_is_idempotent_per_day() {
        let scheduler = DailyScheduler::new(test_config());
        let overrides = OverrideTable::new();
        let mut history = DailyHistory::new();
        let day = date!(2025 - 01 - 02);
        let payload = scheduler
            .publish_daily(day, 1_000, &mut history, &overrides)
            .unwrap();
        assert_eq!(payload.daily_id, "2025-01-02");
        assert_eq!(payload.hard_invalidate_at_utc_ms, 1_735_862_400_000);
        let again = scheduler
            .publish_daily(day, 2_000, &mut history, &overrides)
            .unwrap();
        assert_eq!(again.canonical_key, payload.canonical_key);
        assert_eq!(history.entries.len(), 1);
        assert_eq!(history.entries[0].published_at_utc_ms, 1_000);
    }

    #[test]
    fn test_publish_rejects_day_before_epoch() {
        let scheduler = DailyScheduler::new(test_config());
        let mut history = DailyHistory::new();
        assert!(matches!(
            scheduler.publish_daily(date!(2020 - 06 - 01), 0, &mut history, &OverrideTable::new()),
            Err(ScheduleError::BeforeEpoch { .. })
        ));
    }

    #[test]
    fn test_config_from_env() {
        std::env::remove_var(SchedulerConfig::SECRET_VAR);
        assert!(matches!(
            SchedulerConfig::from_env(),
            Err(ScheduleError::MissingSecret)
        ));
        std::env::set_var(SchedulerConfig::SECRET_VAR, "s3cret");
        std::env::set_var(SchedulerConfig::EPOCH_VAR, "2026-03-01");
        std::env::set_var(SchedulerConfig::POOL_VERSION_VAR, "pool-v9");
        let config = SchedulerConfig::from_env().unwrap();
        assert_eq!(config.secret, b"s3cret".to_vec());
        assert_eq!(config.epoch, date!(2026 - 03 - 01));
        assert_eq!(config.pool_version, "pool-v9");
        assert!(!format!("{:?}", config).contains("s3cret"));

        std::env::set_var(SchedulerConfig::EPOCH_VAR, "March 1st");
        assert!(matches!(
            SchedulerConfig::from_env(),
            Err(ScheduleError::InvalidDate(_))
        ));
        for var in [
            SchedulerConfig::SECRET_VAR,
            SchedulerConfig::EPOCH_VAR,
            SchedulerConfig::POOL_VERSION_VAR,
        ] {
            std::env::remove_var(var);
        }
    }
}
