//! Synchronisation event router
//!
//! One router per domain subscription. Envelope discrimination comes
//! first: feature switches and self-write suppression apply to live
//! notifications only, never to retries.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use cutover_broker::MessageHandler;
use cutover_core::ChangeEventType;

use crate::feature::FeatureSwitches;
use crate::handler::ChangeHandler;
use crate::messages::{RetryKind, SyncMessage};
use crate::reconcile::Reconciler;

/// Routes a domain's sync subscription
pub struct SyncEventRouter {
    domain: String,
    handler: Arc<dyn ChangeHandler>,
    reconciler: Arc<Reconciler>,
    switches: FeatureSwitches,
    writer_identity: String,
}

impl SyncEventRouter {
    pub fn new(
        domain: impl Into<String>,
        handler: Arc<dyn ChangeHandler>,
        reconciler: Arc<Reconciler>,
        switches: FeatureSwitches,
        writer_identity: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            handler,
            reconciler,
            switches,
            writer_identity: writer_identity.into(),
        }
    }
}

#[async_trait]
impl MessageHandler for SyncEventRouter {
    async fn handle(&self, body: JsonValue) -> anyhow::Result<()> {
        let message: SyncMessage = serde_json::from_value(body)?;

        match message {
            SyncMessage::Notification { event } => {
                if event.domain != self.domain {
                    warn!(
                        event_domain = %event.domain,
                        router_domain = %self.domain,
                        "event for another domain on this subscription, dropping"
                    );
                    return Ok(());
                }

                if !self.switches.is_enabled(&event.domain, event.event_type) {
                    info!(
                        domain = %event.domain,
                        event_type = %event.event_type,
                        "event disabled by feature switch, dropping"
                    );
                    return Ok(());
                }

                // Our own Target→Legacy write echoed back; processing it
                // would oscillate forever
                if event.audit_originator == self.writer_identity {
                    debug!(
                        event_type = %event.event_type,
                        "self-originated event, suppressing"
                    );
                    return Ok(());
                }

                match event.event_type {
                    ChangeEventType::Merged => self.reconciler.merged(&event).await?,
                    ChangeEventType::BookingMoved => self.reconciler.booking_moved(&event).await?,
                    ChangeEventType::Inserted
                    | ChangeEventType::Updated
                    | ChangeEventType::Deleted
                    | ChangeEventType::DetailAdded => self.handler.apply(&event).await?,
                }
                Ok(())
            }
            SyncMessage::Retry { handler, item } => {
                match handler {
                    RetryKind::CreateMapping => self.handler.complete_mapping(item).await?,
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::MockChangeHandler;
    use cutover_core::{ChangeEvent, WorkItem};
    use cutover_interfaces::{CapturingRecorder, LegacyError, ReconcileSupport, TargetError};
    use cutover_config::SyncConfig;

    struct NoopSupport;

    #[async_trait]
    impl ReconcileSupport for NoopSupport {
        async fn merge_target(
            &self,
            _losing: &cutover_core::LegacyKey,
            _surviving: &cutover_core::LegacyKey,
        ) -> Result<(), TargetError> {
            Ok(())
        }
        async fn latest_view(
            &self,
            _person: &cutover_core::LegacyKey,
        ) -> Result<Option<JsonValue>, LegacyError> {
            Ok(None)
        }
        async fn push_view(
            &self,
            _person: &cutover_core::LegacyKey,
            _view: &JsonValue,
        ) -> Result<(), TargetError> {
            Ok(())
        }
        async fn sync_back(
            &self,
            _person: &cutover_core::LegacyKey,
            _view: &JsonValue,
        ) -> Result<(), LegacyError> {
            Ok(())
        }
    }

    fn router(handler: MockChangeHandler, config: &SyncConfig) -> SyncEventRouter {
        let reconciler = Arc::new(Reconciler::new(
            "alerts",
            Arc::new(NoopSupport),
            Arc::new(CapturingRecorder::new()),
        ));
        SyncEventRouter::new(
            "alerts",
            Arc::new(handler),
            reconciler,
            FeatureSwitches::from_config(config),
            config.writer_identity.clone(),
        )
    }

    fn event(originator: &str, event_type: ChangeEventType) -> ChangeEvent {
        ChangeEvent::new(
            event_type,
            "alerts",
            originator,
            serde_json::json!({"key": "A1234BC:3"}),
        )
    }

    #[tokio::test]
    async fn test_self_write_is_suppressed() {
        let mut handler = MockChangeHandler::new();
        handler.expect_apply().times(0);

        let config = SyncConfig::default();
        let router = router(handler, &config);

        let body = serde_json::to_value(SyncMessage::Notification {
            event: event(&config.writer_identity, ChangeEventType::Updated),
        })
        .unwrap();
        router.handle(body).await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_event_is_dropped() {
        let mut handler = MockChangeHandler::new();
        handler.expect_apply().times(0);

        let config = SyncConfig {
            disabled_events: vec!["alerts.updated".to_string()],
            ..SyncConfig::default()
        };
        let router = router(handler, &config);

        let body = serde_json::to_value(SyncMessage::Notification {
            event: event("OMS_OWNER", ChangeEventType::Updated),
        })
        .unwrap();
        router.handle(body).await.unwrap();
    }

    #[tokio::test]
    async fn test_live_event_is_dispatched() {
        let mut handler = MockChangeHandler::new();
        handler.expect_apply().times(1).returning(|_| Ok(()));

        let config = SyncConfig::default();
        let router = router(handler, &config);

        let body = serde_json::to_value(SyncMessage::Notification {
            event: event("OMS_OWNER", ChangeEventType::Inserted),
        })
        .unwrap();
        router.handle(body).await.unwrap();
    }

    #[tokio::test]
    async fn test_retry_bypasses_live_event_checks() {
        // A retry whose item would fail every live-event check must still
        // reach its handler
        let mut handler = MockChangeHandler::new();
        handler.expect_apply().times(0);
        handler.expect_complete_mapping().times(1).returning(|_| Ok(()));

        let config = SyncConfig {
            default_enabled: false,
            ..SyncConfig::default()
        };
        let router = router(handler, &config);

        let body = serde_json::to_value(SyncMessage::Retry {
            handler: RetryKind::CreateMapping,
            item: WorkItem::new(serde_json::json!({"key": "A1234BC:3", "target_key": "t-1"})),
        })
        .unwrap();
        router.handle(body).await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_domain_event_is_dropped() {
        let mut handler = MockChangeHandler::new();
        handler.expect_apply().times(0);

        let config = SyncConfig::default();
        let router = router(handler, &config);

        let mut foreign = event("OMS_OWNER", ChangeEventType::Updated);
        foreign.domain = "locations".to_string();
        let body = serde_json::to_value(SyncMessage::Notification { event: foreign }).unwrap();
        router.handle(body).await.unwrap();
    }
}
