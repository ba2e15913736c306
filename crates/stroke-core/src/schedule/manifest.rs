//! Daily pool manifest and the today payload.

use crate::canonical::CanonicalKey;
use crate::level::LevelDocument;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;
pub const TODAY_SCHEMA_VERSION: u32 = 1;

/// Accepted candidate for one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    pub slot: u32,
    pub variant: u32,
    pub canonical_key: CanonicalKey,
}

/// SHA-256 over `slot:variant:key\n` lines in slot order, hex encoded
pub fn pool_digest(records: &[PoolRecord]) -> String {
    let mut hasher = Sha256::new();
    for r in records {
        hasher.update(format!("{}:{}:{}\n", r.slot, r.variant, r.canonical_key).as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMeta {
    pub name: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolManifest {
    pub schema_version: u32,
    pub pool_version: String,
    /// `YYYY-MM-DD`
    pub epoch: String,
    pub slot_count: u32,
    pub base_variant: u32,
    pub max_variant_probe: u32,
    pub digest: String,
    pub artifacts: Vec<ArtifactMeta>,
}

impl PoolManifest {
    pub fn artifact(&self, name: &str) -> Option<&ArtifactMeta> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// What clients fetch for the current day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayPayload {
    pub schema_version: u32,
    pub pool_version: String,
    pub daily_id: String,
    pub daily_slot: u32,
    pub canonical_key: CanonicalKey,
    pub generated_at_utc_ms: i64,
    pub hard_invalidate_at_utc_ms: i64,
    pub level: LevelDocument,
}
