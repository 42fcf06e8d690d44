//! Capabilities the booking-move / merge reconciler needs from a domain

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use cutover_core::LegacyKey;

use crate::adapter::{LegacyError, TargetError};

/// Cross-entity repair operations for identity-changing events.
///
/// Kept separate from [`crate::DomainAdapter`] — only domains whose records
/// hang off a person/booking identity implement it.
#[async_trait]
pub trait ReconcileSupport: Send + Sync {
    /// Instruct the target to merge the losing identity's data into the
    /// surviving one
    async fn merge_target(
        &self,
        losing: &LegacyKey,
        surviving: &LegacyKey,
    ) -> Result<(), TargetError>;

    /// The person's latest-booking view as the legacy system sees it now
    async fn latest_view(&self, person: &LegacyKey) -> Result<Option<JsonValue>, LegacyError>;

    /// Last-modified timestamp of a fetched view.
    ///
    /// The default reads an RFC 3339 `modified_at` field; domains with a
    /// different shape override.
    fn modified_at(&self, view: &JsonValue) -> Option<DateTime<Utc>> {
        view.get("modified_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Upsert the person's view on the target side
    async fn push_view(&self, person: &LegacyKey, view: &JsonValue) -> Result<(), TargetError>;

    /// Push corrected state back into the legacy system after a move
    async fn sync_back(&self, person: &LegacyKey, view: &JsonValue) -> Result<(), LegacyError>;
}
