//! Synchronisation error types

use thiserror::Error;

use cutover_broker::BrokerError;
use cutover_interfaces::{LegacyError, StoreError, TargetError};

/// Errors during live event synchronisation.
///
/// Anything that propagates out of a handler goes back to the broker for
/// redelivery; only legacy not-found and duplicate mappings are absorbed
/// locally.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Legacy(#[from] LegacyError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),
}
