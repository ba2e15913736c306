//! Daily history ledger.
//!
//! Append-only record of what was published on each day. Republishing a day must
//! reproduce the recorded slot and key exactly, and no slot or key may ever be
//! served on two different days.

use crate::canonical::CanonicalKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub const HISTORY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("{daily_id} was published as slot {recorded_slot} ({recorded_key}), now maps to slot {slot} ({key})")]
    DayConflict {
        daily_id: String,
        recorded_slot: u32,
        recorded_key: CanonicalKey,
        slot: u32,
        key: CanonicalKey,
    },
    #[error("slot {slot} already served on {other_day}, cannot reuse it for {daily_id}")]
    SlotReused {
        slot: u32,
        daily_id: String,
        other_day: String,
    },
    #[error("key {key} already served on {other_day}, cannot reuse it for {daily_id}")]
    KeyReused {
        key: CanonicalKey,
        daily_id: String,
        other_day: String,
    },
    #[error("{daily_id} precedes the last recorded day {last}")]
    OutOfOrder { daily_id: String, last: String },
    #[error("{0} is recorded more than once")]
    DuplicateDay(String),
    #[error("unsupported history schema version {0}")]
    SchemaVersion(u32),
    #[error("malformed ledger: {0}")]
    Malformed(String),
}

/// One published day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// `YYYY-MM-DD`
    pub daily_id: String,
    pub daily_slot: u32,
    pub canonical_key: CanonicalKey,
    pub pool_version: String,
    pub published_at_utc_ms: i64,
}

/// How a candidate entry relates to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// Appended as a new day
    Appended,
    /// Same day, slot and key already present
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyHistory {
    pub schema_version: u32,
    pub entries: Vec<HistoryEntry>,
}

impl Default for DailyHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl DailyHistory {
    pub fn new() -> Self {
        Self {
            schema_version: HISTORY_SCHEMA_VERSION,
            entries: Vec::new(),
        }
    }

    pub fn find(&self, daily_id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.daily_id == daily_id)
    }

    /// Keys served so far
    pub fn keys(&self) -> HashSet<CanonicalKey> {
        self.entries.iter().map(|e| e.canonical_key.clone()).collect()
    }

    /// Check `entry` against the ledger without recording it.
    pub fn validate(&self, entry: &HistoryEntry) -> Result<Recorded, HistoryError> {
        if self.schema_version != HISTORY_SCHEMA_VERSION {
            return Err(HistoryError::SchemaVersion(self.schema_version));
        }
        if let Some(existing) = self.find(&entry.daily_id) {
            if existing.daily_slot != entry.daily_slot || existing.canonical_key != entry.canonical_key {
                return Err(HistoryError::DayConflict {
                    daily_id: entry.daily_id.clone(),
                    recorded_slot: existing.daily_slot,
                    recorded_key: existing.canonical_key.clone(),
                    slot: entry.daily_slot,
                    key: entry.canonical_key.clone(),
                });
            }
            return Ok(Recorded::AlreadyPresent);
        }
        for other in &self.entries {
            if other.daily_slot == entry.daily_slot {
                return Err(HistoryError::SlotReused {
                    slot: entry.daily_slot,
                    daily_id: entry.daily_id.clone(),
                    other_day: other.daily_id.clone(),
                });
            }
            if other.canonical_key == entry.canonical_key {
                return Err(HistoryError::KeyReused {
                    key: entry.canonical_key.clone(),
                    daily_id: entry.daily_id.clone(),
                    other_day: other.daily_id.clone(),
                });
            }
        }
        // ISO dates order lexicographically
        if let Some(last) = self.entries.last() {
            if entry.daily_id < last.daily_id {
                return Err(HistoryError::OutOfOrder {
                    daily_id: entry.daily_id.clone(),
                    last: last.daily_id.clone(),
                });
            }
        }
        Ok(Recorded::Appended)
    }

    /// Validate and append.
    pub fn record(&mut self, entry: HistoryEntry) -> Result<Recorded, HistoryError> {
        let outcome = self.validate(&entry)?;
        if outcome == Recorded::Appended {
            self.entries.push(entry);
        }
        Ok(outcome)
    }

    /// Replay every stored entry through the append checks, in order.
    pub fn validate_all(&self) -> Result<(), HistoryError> {
        if self.schema_version != HISTORY_SCHEMA_VERSION {
            return Err(HistoryError::SchemaVersion(self.schema_version));
        }
        let mut replayed = DailyHistory {
            schema_version: self.schema_version,
            entries: Vec::with_capacity(self.entries.len()),
        };
        for entry in &self.entries {
            if replayed.record(entry.clone())? == Recorded::AlreadyPresent {
                return Err(HistoryError::DuplicateDay(entry.daily_id.clone()));
            }
        }
        Ok(())
    }

    /// Parse and check a stored ledger; an inconsistent ledger is rejected.
    pub fn from_json(json: &str) -> Result<Self, HistoryError> {
        let history: Self =
            serde_json::from_str(json).map_err(|e| HistoryError::Malformed(e.to_string()))?;
        history.validate_all()?;
        Ok(history)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
