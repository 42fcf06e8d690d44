//! Mapping store contract: correlation, idempotency, duplicate detection

use async_trait::async_trait;

use cutover_core::{LegacyKey, MappingRecord, RunId};

/// Hard mapping-store failures.
///
/// A logical duplicate is *not* an error — see [`MappingOutcome`]. Anything
/// here must be handled by the caller's retry machinery, never dropped.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Mapping store connection error: {0}")]
    Connection(String),

    #[error("Mapping store upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Mapping store returned a malformed body: {0}")]
    Malformed(String),
}

/// Result of a mapping create.
///
/// Duplicate is a first-class successful outcome carrying both records, so
/// callers can record telemetry without treating migrated-twice as failure.
#[derive(Debug, Clone)]
pub enum MappingOutcome {
    Created(MappingRecord),
    Duplicate {
        existing: MappingRecord,
        attempted: MappingRecord,
    },
}

impl MappingOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, MappingOutcome::Duplicate { .. })
    }

    /// The record now held by the store, whichever way the create went
    pub fn stored(&self) -> &MappingRecord {
        match self {
            MappingOutcome::Created(record) => record,
            MappingOutcome::Duplicate { existing, .. } => existing,
        }
    }
}

/// The single source of truth for legacy↔target correlation.
///
/// Its duplicate response is the system's only mutual-exclusion primitive:
/// concurrent workers racing to create the same mapping are serialized by
/// the store, and `find_by_legacy_key` is the idempotency check that stops
/// a redelivered item from creating a second target entity.
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn create_mapping(&self, record: MappingRecord) -> Result<MappingOutcome, StoreError>;

    async fn find_by_legacy_key(
        &self,
        domain: &str,
        key: &LegacyKey,
    ) -> Result<Option<MappingRecord>, StoreError>;

    /// Count of mappings created by one run; authoritative for completion
    async fn count_by_label(&self, label: RunId) -> Result<u64, StoreError>;

    /// Repair only — mappings are never updated in place
    async fn delete_by_legacy_key(&self, domain: &str, key: &LegacyKey) -> Result<(), StoreError>;
}
