//! Generic per-event handler speaking the mapping-store protocol

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use cutover_broker::RetryDispatcher;
use cutover_core::{ChangeEvent, ChangeEventType, LegacyKey, MappingRecord, MappingType, WorkItem};
use cutover_interfaces::{DomainAdapter, EventRecorder, MappingOutcome, MappingStore};

use crate::error::SyncError;
use crate::messages::{RetryKind, SyncMappingPayload, SyncMessage};

/// Handler the router dispatches non-identity events to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    /// Apply a live insert/update/delete/detail event
    async fn apply(&self, event: &ChangeEvent) -> Result<(), SyncError>;

    /// Continue a requeued mapping create
    async fn complete_mapping(&self, item: WorkItem) -> Result<(), SyncError>;
}

/// Every change event carries the record's natural key
#[derive(Debug, Deserialize)]
struct KeyedPayload {
    key: LegacyKey,
}

/// The generic handler: fetch current legacy state, look up the mapping,
/// and either create on target plus record a `LegacyCreated` mapping, or
/// update target directly with no mapping churn.
pub struct SyncHandler {
    adapter: Arc<dyn DomainAdapter>,
    mappings: Arc<dyn MappingStore>,
    dispatcher: RetryDispatcher,
    recorder: Arc<dyn EventRecorder>,
}

impl SyncHandler {
    pub fn new(
        adapter: Arc<dyn DomainAdapter>,
        mappings: Arc<dyn MappingStore>,
        dispatcher: RetryDispatcher,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            adapter,
            mappings,
            dispatcher,
            recorder,
        }
    }

    fn key_of(event: &ChangeEvent) -> Result<LegacyKey, SyncError> {
        let payload: KeyedPayload = serde_json::from_value(event.payload.clone())
            .map_err(|e| SyncError::MalformedPayload(e.to_string()))?;
        Ok(payload.key)
    }

    async fn upsert(&self, event: &ChangeEvent) -> Result<(), SyncError> {
        let key = Self::key_of(event)?;

        // Fetch the *current* state, not the event's snapshot; redelivered
        // events then converge on the latest data
        let Some(legacy) = self.adapter.fetch(&key).await? else {
            info!(key = %key, "record gone from legacy, nothing to sync");
            return Ok(());
        };
        let entity = self
            .adapter
            .transform(&key, legacy)
            .map_err(|e| SyncError::MalformedPayload(e.to_string()))?;

        match self.mappings.find_by_legacy_key(self.adapter.domain(), &key).await? {
            Some(mapping) => {
                // Already correlated: update in place, no mapping churn
                self.adapter.update_target(&mapping.target_key, &entity).await?;
                debug!(key = %key, target_key = %mapping.target_key, "target updated");
                Ok(())
            }
            None => {
                let target_key = self.adapter.create_target(&entity).await?;
                debug!(key = %key, target_key = %target_key, "target entity created from live event");

                let item = WorkItem::new(serde_json::to_value(SyncMappingPayload { key, target_key })
                    .map_err(|e| SyncError::MalformedPayload(e.to_string()))?);
                self.dispatcher
                    .run_or_requeue(
                        "create_mapping",
                        &item,
                        |next| SyncMessage::Retry {
                            handler: RetryKind::CreateMapping,
                            item: next,
                        },
                        || async { self.try_create_mapping(&item).await.map_err(anyhow::Error::from) },
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn delete(&self, event: &ChangeEvent) -> Result<(), SyncError> {
        let key = Self::key_of(event)?;

        let Some(mapping) = self.mappings.find_by_legacy_key(self.adapter.domain(), &key).await? else {
            debug!(key = %key, "delete for unmapped record, nothing to do");
            return Ok(());
        };

        self.adapter.delete_target(&mapping.target_key).await?;
        self.mappings
            .delete_by_legacy_key(self.adapter.domain(), &key)
            .await?;
        info!(key = %key, target_key = %mapping.target_key, "target entity and mapping removed");
        Ok(())
    }

    async fn try_create_mapping(&self, item: &WorkItem) -> Result<(), SyncError> {
        let payload: SyncMappingPayload = serde_json::from_value(item.payload.clone())
            .map_err(|e| SyncError::MalformedPayload(e.to_string()))?;

        let record = MappingRecord::new(
            self.adapter.domain(),
            payload.key,
            payload.target_key,
            MappingType::LegacyCreated,
        );

        match self.mappings.create_mapping(record).await? {
            MappingOutcome::Created(record) => {
                debug!(key = %record.legacy_key, "sync mapping recorded");
                Ok(())
            }
            MappingOutcome::Duplicate { existing, attempted } => {
                self.recorder.record(
                    &format!("{}-sync-duplicate", self.adapter.domain()),
                    &[
                        ("legacy_key", attempted.legacy_key.to_string()),
                        ("existing_target", existing.target_key.to_string()),
                        ("attempted_target", attempted.target_key.to_string()),
                    ],
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ChangeHandler for SyncHandler {
    async fn apply(&self, event: &ChangeEvent) -> Result<(), SyncError> {
        match event.event_type {
            ChangeEventType::Inserted | ChangeEventType::Updated | ChangeEventType::DetailAdded => {
                self.upsert(event).await
            }
            ChangeEventType::Deleted => self.delete(event).await,
            // Identity changes are the reconciler's job
            ChangeEventType::Merged | ChangeEventType::BookingMoved => {
                debug!(event_type = %event.event_type, "identity change reached upsert handler, ignoring");
                Ok(())
            }
        }
    }

    async fn complete_mapping(&self, item: WorkItem) -> Result<(), SyncError> {
        self.dispatcher
            .run_or_requeue(
                "create_mapping",
                &item,
                |next| SyncMessage::Retry {
                    handler: RetryKind::CreateMapping,
                    item: next,
                },
                || async { self.try_create_mapping(&item).await.map_err(anyhow::Error::from) },
            )
            .await?;
        Ok(())
    }
}
