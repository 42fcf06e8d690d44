//! Operator-facing service facade
//!
//! What a REST layer would call: run lifecycle commands, run history, and
//! dead-letter administration for one domain's migration. Controllers,
//! authentication, and wire formats are the embedding application's
//! concern.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use cutover_broker::{spawn_consumer, ConsumerHandle, InProcessBroker, QueueMessage};
use cutover_config::MigrationConfig;
use cutover_core::{MigrationRun, RunId};
use cutover_interfaces::{DomainAdapter, EventRecorder, MappingStore, RunRepository};

use crate::completion::CompletionMonitor;
use crate::error::MigrationError;
use crate::messages::queue_name;
use crate::orchestrator::MigrationOrchestrator;
use crate::worker::MigrationWorker;

/// One domain's migration engine, fully wired
pub struct MigrationService {
    orchestrator: MigrationOrchestrator,
    worker: Arc<MigrationWorker>,
    monitor: Arc<CompletionMonitor>,
    runs: Arc<dyn RunRepository>,
    broker: Arc<InProcessBroker>,
    config: MigrationConfig,
    domain: String,
    queue: String,
}

impl MigrationService {
    pub fn new(
        adapter: Arc<dyn DomainAdapter>,
        runs: Arc<dyn RunRepository>,
        mappings: Arc<dyn MappingStore>,
        broker: Arc<InProcessBroker>,
        recorder: Arc<dyn EventRecorder>,
        config: MigrationConfig,
    ) -> Self {
        let domain = adapter.domain().to_string();
        let queue = queue_name(&domain);

        let orchestrator = MigrationOrchestrator::new(
            adapter.clone(),
            runs.clone(),
            mappings.clone(),
            broker.clone(),
        );
        let worker = Arc::new(MigrationWorker::new(
            adapter,
            runs.clone(),
            mappings.clone(),
            broker.clone(),
            recorder,
            config.clone(),
        ));
        let monitor = Arc::new(CompletionMonitor::new(
            runs.clone(),
            mappings,
            broker.clone(),
            config.clone(),
            queue.clone(),
        ));

        Self {
            orchestrator,
            worker,
            monitor,
            runs,
            broker,
            config,
            domain,
            queue,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn worker(&self) -> Arc<MigrationWorker> {
        self.worker.clone()
    }

    /// Start the queue consumer with the configured concurrency bound
    pub fn spawn_consumer(&self) -> ConsumerHandle {
        spawn_consumer(
            self.broker.clone(),
            self.queue.clone(),
            self.worker.clone(),
            self.config.worker_concurrency,
        )
    }

    /// Start a run and its completion monitor
    pub async fn start(&self, filter: JsonValue) -> Result<MigrationRun, MigrationError> {
        let run = self.orchestrator.start(filter).await?;
        self.monitor.clone().spawn(run.id);
        Ok(run)
    }

    pub async fn cancel(&self, run_id: RunId) -> Result<(), MigrationError> {
        self.orchestrator.cancel(run_id).await
    }

    pub async fn refresh(&self, run_id: RunId) -> Result<MigrationRun, MigrationError> {
        self.orchestrator.refresh(run_id).await
    }

    pub async fn force_complete(&self, run_id: RunId) -> Result<MigrationRun, MigrationError> {
        self.orchestrator.force_complete(run_id).await
    }

    pub async fn get_run(&self, run_id: RunId) -> Result<MigrationRun, MigrationError> {
        self.runs
            .find_by_id(run_id)
            .await?
            .ok_or(MigrationError::RunNotFound(run_id))
    }

    /// Run history for this domain, newest first
    pub async fn history(&self) -> Result<Vec<MigrationRun>, MigrationError> {
        Ok(self.runs.list(&self.domain).await?)
    }

    // ---- dead letter administration ----

    pub async fn dead_letter_count(&self) -> usize {
        self.broker.dead_letter_count(&self.queue).await
    }

    pub async fn dead_letters(&self) -> Vec<QueueMessage> {
        self.broker.dead_letters(&self.queue).await
    }

    pub async fn purge_dead_letters(&self) -> usize {
        self.broker.purge_dead_letters(&self.queue).await
    }

    pub async fn redrive_dead_letters(&self) -> usize {
        self.broker.redrive_dead_letters(&self.queue).await
    }
}
