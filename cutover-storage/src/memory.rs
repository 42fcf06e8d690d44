//! In-memory run repository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use cutover_core::{MigrationRun, RunId, RunStatus};
use cutover_interfaces::{RepositoryError, RunRepository};

/// Run repository backed by a process-local map.
///
/// Enforces the same `(domain, active)` uniqueness rule as the durable
/// store so orchestrator behaviour is identical in tests.
#[derive(Debug, Default)]
pub struct InMemoryRunRepository {
    runs: RwLock<HashMap<RunId, MigrationRun>>,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn create(&self, run: MigrationRun) -> Result<MigrationRun, RepositoryError> {
        let mut runs = self.runs.write().await;

        if let Some(active) = runs.values().find(|r| r.domain == run.domain && r.is_active()) {
            return Err(RepositoryError::ActiveRunExists {
                domain: run.domain.clone(),
                existing: active.id,
            });
        }

        runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn find_by_id(&self, id: RunId) -> Result<Option<MigrationRun>, RepositoryError> {
        Ok(self.runs.read().await.get(&id).cloned())
    }

    async fn find_active(&self, domain: &str) -> Result<Option<MigrationRun>, RepositoryError> {
        let runs = self.runs.read().await;
        Ok(runs
            .values()
            .find(|r| r.domain == domain && r.is_active())
            .cloned())
    }

    async fn list(&self, domain: &str) -> Result<Vec<MigrationRun>, RepositoryError> {
        let runs = self.runs.read().await;
        let mut matching: Vec<MigrationRun> =
            runs.values().filter(|r| r.domain == domain).cloned().collect();
        // Run ids are time-ordered, so this is newest first
        matching.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(matching)
    }

    async fn update_status(
        &self,
        id: RunId,
        status: RunStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        run.status = status;
        if ended_at.is_some() {
            run.ended_at = ended_at;
        }
        Ok(())
    }

    async fn record_failure(&self, id: RunId) -> Result<(), RepositoryError> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        run.failed_count += 1;
        Ok(())
    }

    async fn set_counts(&self, id: RunId, migrated: u64, failed: u64) -> Result<(), RepositoryError> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        run.migrated_count = migrated;
        run.failed_count = failed;
        Ok(())
    }
}
