//! Run repository contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cutover_core::{MigrationRun, RunId, RunStatus};

/// Run persistence errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Run not found: {0}")]
    NotFound(RunId),

    /// The `(domain, active)` uniqueness constraint fired
    #[error("An active run already exists for domain '{domain}': {existing}")]
    ActiveRunExists { domain: String, existing: RunId },

    #[error("Repository connection error: {message}")]
    Connection { message: String },

    #[error("Internal repository error: {message}")]
    Internal { message: String },
}

/// Persists migration runs independently of the queues.
///
/// The one-active-run-per-domain rule is a store-side uniqueness
/// constraint, not an in-process singleton — it survives restarts and holds
/// across multiple orchestrator instances. `create` reports a violation as
/// [`RepositoryError::ActiveRunExists`].
#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn create(&self, run: MigrationRun) -> Result<MigrationRun, RepositoryError>;

    async fn find_by_id(&self, id: RunId) -> Result<Option<MigrationRun>, RepositoryError>;

    /// The run currently holding the domain's uniqueness slot, if any
    async fn find_active(&self, domain: &str) -> Result<Option<MigrationRun>, RepositoryError>;

    /// Run history for a domain, newest first
    async fn list(&self, domain: &str) -> Result<Vec<MigrationRun>, RepositoryError>;

    async fn update_status(
        &self,
        id: RunId,
        status: RunStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;

    /// Best-effort failure tally; not required to be exact under
    /// concurrent workers
    async fn record_failure(&self, id: RunId) -> Result<(), RepositoryError>;

    /// Overwrite counts with authoritative values (completion, refresh)
    async fn set_counts(&self, id: RunId, migrated: u64, failed: u64) -> Result<(), RepositoryError>;
}
