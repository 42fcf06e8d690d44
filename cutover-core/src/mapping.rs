//! Mapping records correlating legacy keys to target keys

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::run::RunId;
use crate::ParseError;

/// Natural key of a record in the legacy system.
///
/// Composite keys are colon-joined so a mapping store can index a single
/// opaque string regardless of how many fields the domain's key carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyKey(String);

impl LegacyKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Build a composite key from its ordered parts
    pub fn composite(parts: &[&str]) -> Self {
        Self(parts.join(":"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LegacyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LegacyKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Target-assigned identifier, usually a UUID but opaque to the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetKey(String);

impl TargetKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TargetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a mapping came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    /// Created by a batch migration run
    Migrated,

    /// Created by the sync router for a record born in the legacy system
    LegacyCreated,

    /// Created by the sync router for a record born in the target system
    TargetCreated,
}

impl std::fmt::Display for MappingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingType::Migrated => write!(f, "migrated"),
            MappingType::LegacyCreated => write!(f, "legacy_created"),
            MappingType::TargetCreated => write!(f, "target_created"),
        }
    }
}

impl std::str::FromStr for MappingType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "migrated" => Ok(MappingType::Migrated),
            "legacy_created" => Ok(MappingType::LegacyCreated),
            "target_created" => Ok(MappingType::TargetCreated),
            _ => Err(ParseError {
                kind: "mapping type",
                value: s.to_string(),
            }),
        }
    }
}

/// Correlation between one legacy record and its target counterpart.
///
/// At most one record exists per `(domain, legacy_key)`; the mapping store
/// enforces this and reports a second create as a structured duplicate.
/// Records are never updated in place — deletion is an explicit repair
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub domain: String,

    pub legacy_key: LegacyKey,

    pub target_key: TargetKey,

    pub mapping_type: MappingType,

    /// The run that created this record; `None` for sync-created mappings
    pub label: Option<RunId>,

    pub created_at: DateTime<Utc>,
}

impl MappingRecord {
    pub fn new(
        domain: impl Into<String>,
        legacy_key: LegacyKey,
        target_key: TargetKey,
        mapping_type: MappingType,
    ) -> Self {
        Self {
            domain: domain.into(),
            legacy_key,
            target_key,
            mapping_type,
            label: None,
            created_at: Utc::now(),
        }
    }

    /// Tag the record with the run that created it
    pub fn with_label(mut self, label: RunId) -> Self {
        self.label = Some(label);
        self
    }
}
