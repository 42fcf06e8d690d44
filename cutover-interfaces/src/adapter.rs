//! The per-domain capability interface the generic engine is built on
//!
//! Every domain migration (alerts, locations, non-associations, ...) supplies
//! one [`DomainAdapter`] and inherits the whole orchestration, correlation,
//! and retry machinery. Composition instead of per-domain subclassing.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use cutover_core::{LegacyKey, TargetKey};

/// Errors reading from the legacy system of record
#[derive(Debug, thiserror::Error)]
pub enum LegacyError {
    /// Record vanished between enumeration and fetch
    #[error("Legacy record not found: {0}")]
    NotFound(String),

    #[error("Legacy connection error: {0}")]
    Connection(String),

    #[error("Legacy upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },
}

impl LegacyError {
    /// Whether requeueing the work item can help
    pub fn is_retryable(&self) -> bool {
        match self {
            LegacyError::NotFound(_) => false,
            LegacyError::Connection(_) => true,
            LegacyError::Upstream { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

/// Errors writing to the target domain service
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// Target rejected the entity; retrying the same payload cannot succeed
    #[error("Target rejected entity: {0}")]
    Rejected(String),

    #[error("Target connection error: {0}")]
    Connection(String),

    #[error("Target upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Operation not supported by this domain: {0}")]
    Unsupported(&'static str),
}

impl TargetError {
    pub fn is_retryable(&self) -> bool {
        match self {
            TargetError::Rejected(_) | TargetError::Unsupported(_) => false,
            TargetError::Connection(_) => true,
            TargetError::Upstream { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

/// Domain-specific transformation failure; always a hard per-item failure
#[derive(Debug, thiserror::Error)]
#[error("Transform failed for {key}: {message}")]
pub struct TransformError {
    pub key: String,
    pub message: String,
}

/// One page of legacy ids
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_number: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page_number: u32) -> Self {
        Self { items, page_number }
    }

    /// A short page means enumeration has reached the end
    pub fn is_last(&self, page_size: u32) -> bool {
        self.items.len() < page_size as usize
    }
}

/// Per-domain capabilities consumed by the migration and sync engines.
///
/// `fetch` returning `Ok(None)` means the record vanished after
/// enumeration — a logged skip, never a run failure. `transform` is the
/// domain's field-mapping rule set and stays synchronous; everything that
/// touches the network is async and must not block a shared loop thread.
#[async_trait]
pub trait DomainAdapter: Send + Sync {
    /// Domain name, used for queue names, mapping records, and telemetry
    fn domain(&self) -> &str;

    /// Enumerate legacy ids matching the filter, one page at a time
    async fn ids(
        &self,
        filter: &JsonValue,
        page_number: u32,
        page_size: u32,
    ) -> Result<Page<LegacyKey>, LegacyError>;

    /// Legacy's estimate of how many records match the filter
    async fn estimated_count(&self, filter: &JsonValue) -> Result<u64, LegacyError>;

    /// Fetch the full legacy entity; `None` when it no longer exists
    async fn fetch(&self, key: &LegacyKey) -> Result<Option<JsonValue>, LegacyError>;

    /// Map the legacy entity into the target's shape
    fn transform(&self, key: &LegacyKey, legacy: JsonValue) -> Result<JsonValue, TransformError>;

    /// Create the entity on the target, returning the target-assigned key
    async fn create_target(&self, entity: &JsonValue) -> Result<TargetKey, TargetError>;

    /// Update an entity the target already owns
    async fn update_target(&self, key: &TargetKey, entity: &JsonValue) -> Result<(), TargetError>;

    /// Remove an entity from the target; optional per domain
    async fn delete_target(&self, key: &TargetKey) -> Result<(), TargetError> {
        let _ = key;
        Err(TargetError::Unsupported("delete"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_last_detection() {
        let full: Page<LegacyKey> = Page::new(vec![LegacyKey::new("a"), LegacyKey::new("b")], 0);
        assert!(!full.is_last(2));

        let short: Page<LegacyKey> = Page::new(vec![LegacyKey::new("a")], 1);
        assert!(short.is_last(2));

        let empty: Page<LegacyKey> = Page::new(vec![], 2);
        assert!(empty.is_last(2));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LegacyError::Connection("timeout".into()).is_retryable());
        assert!(!LegacyError::NotFound("A1234BC".into()).is_retryable());

        assert!(TargetError::Upstream {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!TargetError::Upstream {
            status: 400,
            message: "bad request".into()
        }
        .is_retryable());
        assert!(!TargetError::Rejected("validation".into()).is_retryable());
    }
}
