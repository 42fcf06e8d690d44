//! In-memory mapping store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use cutover_core::{LegacyKey, MappingRecord, RunId};
use cutover_interfaces::{MappingOutcome, MappingStore, StoreError};

/// Mapping store backed by a process-local map.
///
/// Enforces the same at-most-one-record-per-`(domain, legacy_key)`
/// invariant as the real service, so engine behaviour under duplicates is
/// identical in tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
    records: RwLock<HashMap<(String, LegacyKey), MappingRecord>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing duplicate detection (test setup)
    pub async fn seed(&self, record: MappingRecord) {
        self.records
            .write()
            .await
            .insert((record.domain.clone(), record.legacy_key.clone()), record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<MappingRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn create_mapping(&self, record: MappingRecord) -> Result<MappingOutcome, StoreError> {
        let mut records = self.records.write().await;
        let slot = (record.domain.clone(), record.legacy_key.clone());

        if let Some(existing) = records.get(&slot) {
            debug!(legacy_key = %record.legacy_key, "duplicate mapping create");
            return Ok(MappingOutcome::Duplicate {
                existing: existing.clone(),
                attempted: record,
            });
        }

        records.insert(slot, record.clone());
        Ok(MappingOutcome::Created(record))
    }

    async fn find_by_legacy_key(
        &self,
        domain: &str,
        key: &LegacyKey,
    ) -> Result<Option<MappingRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(&(domain.to_string(), key.clone())).cloned())
    }

    async fn count_by_label(&self, label: RunId) -> Result<u64, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| r.label == Some(label)).count() as u64)
    }

    async fn delete_by_legacy_key(&self, domain: &str, key: &LegacyKey) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .remove(&(domain.to_string(), key.clone()));
        Ok(())
    }
}
