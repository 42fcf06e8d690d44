//! Messages on a domain's sync subscription
//!
//! The subscription is polymorphic: live change events share the queue
//! with typed retry messages. The envelope's `kind` field decides which is
//! which *before* any feature-switch or self-write check runs — those
//! apply only to live events, never to retries.

use serde::{Deserialize, Serialize};

use cutover_core::{ChangeEvent, LegacyKey, TargetKey, WorkItem};

/// Envelope for the sync subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncMessage {
    /// A live change event from the legacy stream
    Notification { event: ChangeEvent },

    /// A requeued action, tagged with the handler that owns it
    Retry { handler: RetryKind, item: WorkItem },
}

/// Which handler a retry message is dispatched back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryKind {
    /// Mapping create for a target entity the first attempt already made
    CreateMapping,
}

/// Payload of a `CreateMapping` retry item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMappingPayload {
    pub key: LegacyKey,
    pub target_key: TargetKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutover_core::ChangeEventType;

    #[test]
    fn test_envelope_kind_discrimination() {
        let event = ChangeEvent::new(
            ChangeEventType::Updated,
            "alerts",
            "OMS_OWNER",
            serde_json::json!({"key": "A1234BC:3"}),
        );
        let json = serde_json::to_value(SyncMessage::Notification { event }).unwrap();
        assert_eq!(json["kind"], "notification");

        let retry = SyncMessage::Retry {
            handler: RetryKind::CreateMapping,
            item: WorkItem::new(serde_json::json!({"key": "A1234BC:3", "target_key": "t-1"})),
        };
        let json = serde_json::to_value(&retry).unwrap();
        assert_eq!(json["kind"], "retry");
        assert_eq!(json["handler"], "create_mapping");

        let back: SyncMessage = serde_json::from_value(json).unwrap();
        assert!(matches!(
            back,
            SyncMessage::Retry {
                handler: RetryKind::CreateMapping,
                ..
            }
        ));
    }
}
