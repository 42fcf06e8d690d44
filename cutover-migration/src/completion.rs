//! Completion detection
//!
//! There is no synchronous fan-in, so a per-run monitor compares the
//! mapping store's count for the run's label against the estimate on a
//! schedule. A count that reaches the estimate completes the run; a count
//! that stops moving for a configured number of checks completes it too.
//! The stabilization window is a heuristic, not a guarantee — an
//! undercount is possible while a mapping create is still retrying, which
//! is what the operator's refresh and force-complete calls are for.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use cutover_broker::InProcessBroker;
use cutover_config::MigrationConfig;
use cutover_core::{RunId, RunStatus};
use cutover_interfaces::{MappingStore, RunRepository};

use crate::error::MigrationError;

/// Watches active runs until they reach a terminal status
pub struct CompletionMonitor {
    runs: Arc<dyn RunRepository>,
    mappings: Arc<dyn MappingStore>,
    broker: Arc<InProcessBroker>,
    config: MigrationConfig,
    queue: String,
}

impl CompletionMonitor {
    pub fn new(
        runs: Arc<dyn RunRepository>,
        mappings: Arc<dyn MappingStore>,
        broker: Arc<InProcessBroker>,
        config: MigrationConfig,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            runs,
            mappings,
            broker,
            config,
            queue: queue.into(),
        }
    }

    /// Watch one run to its terminal status
    pub async fn watch(&self, run_id: RunId) -> Result<(), MigrationError> {
        tokio::time::sleep(self.config.complete_check_delay).await;

        let mut last_count: Option<u64> = None;
        let mut stable_checks: u32 = 0;

        loop {
            let Some(run) = self.runs.find_by_id(run_id).await? else {
                warn!(%run_id, "run disappeared, stopping monitor");
                return Ok(());
            };
            if run.is_terminal() {
                return Ok(());
            }

            if run.status == RunStatus::CancelRequested {
                // Final sweep: cancelled only once the queue has drained
                if self.broker.is_idle(&self.queue).await {
                    self.runs
                        .update_status(run_id, RunStatus::Cancelled, Some(Utc::now()))
                        .await?;
                    info!(%run_id, "run cancelled, queues drained");
                    return Ok(());
                }
            } else {
                match self.mappings.count_by_label(run_id).await {
                    Ok(count) if count >= run.estimated_count => {
                        self.complete(run_id, count, run.failed_count).await?;
                        return Ok(());
                    }
                    Ok(count) => {
                        if last_count == Some(count) {
                            stable_checks += 1;
                            if stable_checks >= self.config.complete_check_count {
                                warn!(
                                    %run_id,
                                    count,
                                    estimated = run.estimated_count,
                                    "count stable below estimate, completing anyway"
                                );
                                self.complete(run_id, count, run.failed_count).await?;
                                return Ok(());
                            }
                        } else {
                            stable_checks = 0;
                            last_count = Some(count);
                        }
                    }
                    Err(store_error) => {
                        // Transient store trouble must not kill the monitor
                        warn!(%run_id, %store_error, "completion check failed, will retry");
                    }
                }
            }

            tokio::time::sleep(self.config.complete_check_retry).await;
        }
    }

    async fn complete(&self, run_id: RunId, migrated: u64, failed: u64) -> Result<(), MigrationError> {
        self.runs.set_counts(run_id, migrated, failed).await?;
        self.runs
            .update_status(run_id, RunStatus::Completed, Some(Utc::now()))
            .await?;
        info!(%run_id, migrated, failed, "migration run completed");
        Ok(())
    }

    /// Spawn the watch loop as a background task
    pub fn spawn(self: Arc<Self>, run_id: RunId) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(watch_error) = self.watch(run_id).await {
                error!(%run_id, %watch_error, "completion monitor failed");
            }
        })
    }
}
