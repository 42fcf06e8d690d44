//! Messages on a domain's migration subscription
//!
//! One queue per domain carries three message kinds, discriminated by the
//! envelope's `kind` field and dispatched with an explicit match. A failed
//! `migrate` is redelivered as-is by the broker; a failed mapping create is
//! republished as `retry_mapping` because its payload must carry the target
//! key the first attempt already obtained.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use cutover_core::{LegacyKey, RunId, TargetKey, WorkItem};

/// Name of a domain's migration queue
pub fn queue_name(domain: &str) -> String {
    format!("migration-{}", domain)
}

/// Envelope for the migration subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationMessage {
    /// Enumerate one page of ids and chain the next page
    NextPage {
        run_id: RunId,
        filter: JsonValue,
        page: u32,
    },

    /// Migrate a single legacy record
    Migrate { item: WorkItem },

    /// Retry of a mapping create whose target entity already exists
    RetryMapping { item: WorkItem },
}

/// Payload of a `Migrate` work item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigratePayload {
    pub key: LegacyKey,
}

/// Payload of a `RetryMapping` work item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingPayload {
    pub key: LegacyKey,
    pub target_key: TargetKey,
}
