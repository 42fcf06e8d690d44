//! Run lifecycle orchestration

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::info;

use cutover_broker::InProcessBroker;
use cutover_core::{MigrationRun, RunId, RunStatus};
use cutover_interfaces::{DomainAdapter, MappingStore, RunRepository};

use crate::error::MigrationError;
use crate::messages::{queue_name, MigrationMessage};

/// Starts, cancels, refreshes, and force-completes runs for one domain
pub struct MigrationOrchestrator {
    adapter: Arc<dyn DomainAdapter>,
    runs: Arc<dyn RunRepository>,
    mappings: Arc<dyn MappingStore>,
    broker: Arc<InProcessBroker>,
    queue: String,
}

impl MigrationOrchestrator {
    pub fn new(
        adapter: Arc<dyn DomainAdapter>,
        runs: Arc<dyn RunRepository>,
        mappings: Arc<dyn MappingStore>,
        broker: Arc<InProcessBroker>,
    ) -> Self {
        let queue = queue_name(adapter.domain());
        Self {
            adapter,
            runs,
            mappings,
            broker,
            queue,
        }
    }

    /// Start a run: conflict check, estimate, persist, seed page zero.
    ///
    /// The repository's uniqueness constraint is the real gate against
    /// concurrent starts; the `find_active` check only produces a
    /// friendlier error for the common case.
    pub async fn start(&self, filter: JsonValue) -> Result<MigrationRun, MigrationError> {
        let domain = self.adapter.domain();

        if let Some(active) = self.runs.find_active(domain).await? {
            return Err(MigrationError::RunInProgress {
                domain: domain.to_string(),
                existing: active.id,
            });
        }

        let estimated = self.adapter.estimated_count(&filter).await?;
        let run = self
            .runs
            .create(MigrationRun::new(domain, filter.clone(), estimated))
            .await?;

        self.broker
            .publish(
                &self.queue,
                &MigrationMessage::NextPage {
                    run_id: run.id,
                    filter,
                    page: 0,
                },
            )
            .await?;

        info!(run_id = %run.id, domain, estimated, "migration run started");
        Ok(run)
    }

    /// Request cancellation. Synchronous and idempotent; workers drop
    /// in-flight items cooperatively and the completion monitor marks the
    /// run cancelled once the queue drains.
    pub async fn cancel(&self, run_id: RunId) -> Result<(), MigrationError> {
        let run = self
            .runs
            .find_by_id(run_id)
            .await?
            .ok_or(MigrationError::RunNotFound(run_id))?;

        match run.status {
            RunStatus::Started => {
                self.runs
                    .update_status(run_id, RunStatus::CancelRequested, None)
                    .await?;
                info!(%run_id, "cancellation requested");
                Ok(())
            }
            RunStatus::CancelRequested | RunStatus::Cancelled => Ok(()),
            RunStatus::Completed => Err(MigrationError::InvalidState {
                run_id,
                status: run.status,
                operation: "cancel",
            }),
        }
    }

    /// Re-derive a completed run's counts from the mapping store, e.g.
    /// after a crash left in-memory tallies behind
    pub async fn refresh(&self, run_id: RunId) -> Result<MigrationRun, MigrationError> {
        let run = self
            .runs
            .find_by_id(run_id)
            .await?
            .ok_or(MigrationError::RunNotFound(run_id))?;

        if run.status != RunStatus::Completed {
            return Err(MigrationError::InvalidState {
                run_id,
                status: run.status,
                operation: "refresh",
            });
        }

        let migrated = self.mappings.count_by_label(run_id).await?;
        self.runs.set_counts(run_id, migrated, run.failed_count).await?;
        info!(%run_id, migrated, "run counts refreshed");

        self.runs
            .find_by_id(run_id)
            .await?
            .ok_or(MigrationError::RunNotFound(run_id))
    }

    /// Operator override for a run whose counts never stabilize, e.g. a
    /// stuck retry keeping the mapping count below the estimate forever
    pub async fn force_complete(&self, run_id: RunId) -> Result<MigrationRun, MigrationError> {
        let run = self
            .runs
            .find_by_id(run_id)
            .await?
            .ok_or(MigrationError::RunNotFound(run_id))?;

        if run.is_terminal() {
            return Err(MigrationError::InvalidState {
                run_id,
                status: run.status,
                operation: "force-complete",
            });
        }

        let migrated = self.mappings.count_by_label(run_id).await?;
        self.runs.set_counts(run_id, migrated, run.failed_count).await?;
        self.runs
            .update_status(run_id, RunStatus::Completed, Some(Utc::now()))
            .await?;
        info!(%run_id, migrated, "run force-completed by operator");

        self.runs
            .find_by_id(run_id)
            .await?
            .ok_or(MigrationError::RunNotFound(run_id))
    }
}
