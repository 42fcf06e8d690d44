//! Per-item migration worker
//!
//! Handles every message kind on a domain's migration queue. The per-item
//! pipeline is: run status check (cancelled runs drop their items), mapping
//! existence check (the idempotency gate), fetch, transform, push to
//! target, then record the mapping through the retry dispatcher. Handlers
//! are safe to run more than once for the same payload.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use cutover_broker::{InProcessBroker, MessageHandler, RetryDispatcher};
use cutover_config::MigrationConfig;
use cutover_core::{LegacyKey, MappingRecord, MappingType, RunId, WorkItem};
use cutover_interfaces::{DomainAdapter, EventRecorder, LegacyError, MappingOutcome, MappingStore, RunRepository};

use crate::messages::{queue_name, MappingPayload, MigratePayload, MigrationMessage};

/// Worker for one domain's migration subscription
pub struct MigrationWorker {
    adapter: Arc<dyn DomainAdapter>,
    runs: Arc<dyn RunRepository>,
    mappings: Arc<dyn MappingStore>,
    recorder: Arc<dyn EventRecorder>,
    dispatcher: RetryDispatcher,
    config: MigrationConfig,
    queue: String,
}

impl MigrationWorker {
    pub fn new(
        adapter: Arc<dyn DomainAdapter>,
        runs: Arc<dyn RunRepository>,
        mappings: Arc<dyn MappingStore>,
        broker: Arc<InProcessBroker>,
        recorder: Arc<dyn EventRecorder>,
        config: MigrationConfig,
    ) -> Self {
        let queue = queue_name(adapter.domain());
        let dispatcher = RetryDispatcher::new(broker, queue.clone());
        Self {
            adapter,
            runs,
            mappings,
            recorder,
            dispatcher,
            config,
            queue,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    fn broker(&self) -> &Arc<InProcessBroker> {
        self.dispatcher.broker()
    }

    /// Enumerate one page of ids, publish a work item per id, and chain
    /// the next page through the queue so no request thread walks an
    /// unbounded dataset
    async fn fan_out_page(&self, run_id: RunId, filter: JsonValue, page: u32) -> anyhow::Result<()> {
        let Some(run) = self.runs.find_by_id(run_id).await? else {
            warn!(%run_id, page, "page request for unknown run, dropping");
            return Ok(());
        };
        if run.is_cancelling() {
            debug!(%run_id, page, "run is cancelling, stopping enumeration");
            return Ok(());
        }

        let ids = self.adapter.ids(&filter, page, self.config.page_size).await?;
        debug!(%run_id, page, count = ids.items.len(), "fanning out page");

        for key in &ids.items {
            let item = WorkItem::for_run(run_id, serde_json::to_value(MigratePayload { key: key.clone() })?);
            self.broker()
                .publish(&self.queue, &MigrationMessage::Migrate { item })
                .await?;
        }

        if !ids.is_last(self.config.page_size) {
            self.broker()
                .publish(
                    &self.queue,
                    &MigrationMessage::NextPage {
                        run_id,
                        filter,
                        page: page + 1,
                    },
                )
                .await?;
        }

        Ok(())
    }

    /// Migrate a single legacy record.
    ///
    /// Returning an error hands the item back to the broker for redelivery
    /// with the same payload; every locally-absorbed outcome returns `Ok`.
    async fn migrate(&self, item: WorkItem) -> anyhow::Result<()> {
        let payload: MigratePayload = serde_json::from_value(item.payload.clone())?;
        let Some(run_id) = item.context.run_id else {
            warn!(key = %payload.key, "work item without a run, dropping");
            return Ok(());
        };

        let Some(run) = self.runs.find_by_id(run_id).await? else {
            warn!(%run_id, key = %payload.key, "work item for unknown run, dropping");
            return Ok(());
        };
        if run.is_cancelling() {
            debug!(%run_id, key = %payload.key, "run is cancelling, dropping work item");
            return Ok(());
        }

        // Idempotency gate: a mapping means a previous delivery already
        // created the target entity
        if let Some(existing) = self
            .mappings
            .find_by_legacy_key(self.adapter.domain(), &payload.key)
            .await?
        {
            info!(key = %payload.key, target_key = %existing.target_key, "already migrated, skipping");
            return Ok(());
        }

        let legacy = match self.adapter.fetch(&payload.key).await {
            Ok(Some(entity)) => entity,
            Ok(None) | Err(LegacyError::NotFound(_)) => {
                info!(key = %payload.key, "record vanished after enumeration, skipping");
                return Ok(());
            }
            Err(error) if error.is_retryable() => return Err(error.into()),
            Err(error) => {
                self.fail_item(run_id, &payload.key, &error).await;
                return Ok(());
            }
        };

        let entity = match self.adapter.transform(&payload.key, legacy) {
            Ok(entity) => entity,
            Err(error) => {
                self.fail_item(run_id, &payload.key, &error).await;
                return Ok(());
            }
        };

        let target_key = match self.adapter.create_target(&entity).await {
            Ok(target_key) => target_key,
            Err(error) if error.is_retryable() => return Err(error.into()),
            Err(error) => {
                self.fail_item(run_id, &payload.key, &error).await;
                return Ok(());
            }
        };
        debug!(key = %payload.key, target_key = %target_key, "created target entity");

        let mapping_item = WorkItem::for_run(
            run_id,
            serde_json::to_value(MappingPayload {
                key: payload.key,
                target_key,
            })?,
        );
        self.dispatcher
            .run_or_requeue(
                "mapping",
                &mapping_item,
                |next| MigrationMessage::RetryMapping { item: next },
                || self.try_create_mapping(&mapping_item),
            )
            .await?;

        Ok(())
    }

    /// Redelivered mapping create. Same handler as the first attempt; the
    /// target entity already exists, so this runs even for a cancelling
    /// run — dropping it would orphan the entity.
    async fn complete_mapping(&self, item: WorkItem) -> anyhow::Result<()> {
        self.dispatcher
            .run_or_requeue(
                "mapping",
                &item,
                |next| MigrationMessage::RetryMapping { item: next },
                || self.try_create_mapping(&item),
            )
            .await?;
        Ok(())
    }

    async fn try_create_mapping(&self, item: &WorkItem) -> anyhow::Result<()> {
        let payload: MappingPayload = serde_json::from_value(item.payload.clone())?;
        let Some(run_id) = item.context.run_id else {
            anyhow::bail!("mapping item without a run");
        };

        let record = MappingRecord::new(
            self.adapter.domain(),
            payload.key,
            payload.target_key,
            MappingType::Migrated,
        )
        .with_label(run_id);

        match self.mappings.create_mapping(record).await? {
            MappingOutcome::Created(record) => {
                debug!(key = %record.legacy_key, target_key = %record.target_key, "mapping recorded");
                Ok(())
            }
            MappingOutcome::Duplicate { existing, attempted } => {
                // Concurrent or resumed run got there first; success either way
                self.recorder.record(
                    &format!("{}-migration-duplicate", self.adapter.domain()),
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

    async fn fail_item(
        &self,
        run_id: RunId,
        key: &LegacyKey,
        error: &(dyn std::fmt::Display + Send + Sync),
    ) {
        let error = error.to_string();
        warn!(%run_id, key = %key, %error, "hard failure migrating item");
        if let Err(repo_error) = self.runs.record_failure(run_id).await {
            warn!(%run_id, %repo_error, "failed to record failure count");
        }
        self.recorder.record(
            &format!("{}-migration-error", self.adapter.domain()),
            &[("legacy_key", key.to_string()), ("error", error)],
        );
    }
}

#[async_trait]
impl MessageHandler for MigrationWorker {
    async fn handle(&self, body: JsonValue) -> anyhow::Result<()> {
        let message: MigrationMessage = serde_json::from_value(body)?;
        match message {
            MigrationMessage::NextPage { run_id, filter, page } => {
                self.fan_out_page(run_id, filter, page).await
            }
            MigrationMessage::Migrate { item } => self.migrate(item).await,
            MigrationMessage::RetryMapping { item } => self.complete_mapping(item).await,
        }
    }
}
