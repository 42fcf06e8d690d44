//! Broker error types

use thiserror::Error;

/// Broker errors
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Failed to serialize message body: {0}")]
    Serialization(#[from] serde_json::Error),
}
