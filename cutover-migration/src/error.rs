//! Migration error types

use thiserror::Error;

use cutover_broker::BrokerError;
use cutover_core::{RunId, RunStatus};
use cutover_interfaces::{LegacyError, RepositoryError, StoreError};

/// Errors surfaced synchronously to the operator or the queue machinery
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Another run of this domain still owns the uniqueness slot
    #[error("A run is already in progress for domain '{domain}': {existing}")]
    RunInProgress { domain: String, existing: RunId },

    #[error("Run not found: {0}")]
    RunNotFound(RunId),

    /// Operation not valid for the run's current status
    #[error("Cannot {operation} run {run_id} in status {status}")]
    InvalidState {
        run_id: RunId,
        status: RunStatus,
        operation: &'static str,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Legacy(#[from] LegacyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}
