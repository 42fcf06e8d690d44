//! Live change events consumed by the sync router

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of change a legacy record went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEventType {
    Inserted,
    Updated,
    Deleted,

    /// Structural sub-event: a detail row was added to a parent record
    DetailAdded,

    /// Two person records were merged; the losing identity disappears
    Merged,

    /// A booking moved to a different person
    BookingMoved,
}

impl ChangeEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeEventType::Inserted => "inserted",
            ChangeEventType::Updated => "updated",
            ChangeEventType::Deleted => "deleted",
            ChangeEventType::DetailAdded => "detail_added",
            ChangeEventType::Merged => "merged",
            ChangeEventType::BookingMoved => "booking_moved",
        }
    }

    /// Identity-changing events are routed to the reconciler, not the
    /// regular upsert handlers
    pub fn is_identity_change(&self) -> bool {
        matches!(self, ChangeEventType::Merged | ChangeEventType::BookingMoved)
    }
}

impl std::fmt::Display for ChangeEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notification that a legacy record changed.
///
/// Consumed once per delivery; handlers tolerate redelivery. The
/// `audit_originator` names the system or process that last wrote the
/// legacy record and is how the router suppresses its own writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_type: ChangeEventType,

    pub domain: String,

    /// Which system/process last wrote the legacy record
    pub audit_originator: String,

    pub occurred_at: DateTime<Utc>,

    /// Domain payload, opaque to the router
    pub payload: serde_json::Value,
}

impl ChangeEvent {
    pub fn new(
        event_type: ChangeEventType,
        domain: impl Into<String>,
        audit_originator: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            domain: domain.into(),
            audit_originator: audit_originator.into(),
            occurred_at: Utc::now(),
            payload,
        }
    }
}
