//! The run-or-requeue primitive
//!
//! `RetryDispatcher::run_or_requeue` executes an action and, on any
//! failure, republishes the *original* work item — payload untouched,
//! attempt incremented — tagged so the consumer can dispatch it back to the
//! same handler. Retries are re-deliveries, not special-cased business
//! logic. Items whose attempts reach the broker maximum are dead-lettered
//! instead of requeued.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use cutover_core::WorkItem;

use crate::error::BrokerError;
use crate::queue::InProcessBroker;

/// Generic "do X, and on failure requeue X with the same payload"
pub struct RetryDispatcher {
    broker: Arc<InProcessBroker>,
    queue: String,
}

impl RetryDispatcher {
    /// `queue` is where retries (and, when exhausted, dead letters) land —
    /// normally the same subscription the first attempt came from
    pub fn new(broker: Arc<InProcessBroker>, queue: impl Into<String>) -> Self {
        Self {
            broker,
            queue: queue.into(),
        }
    }

    pub fn broker(&self) -> &Arc<InProcessBroker> {
        &self.broker
    }

    /// Execute `action`; on failure, requeue the original item.
    ///
    /// `make_retry` wraps the next-attempt item in the subscription's
    /// envelope so the retry carries its handler-kind discriminator.
    /// Returns `true` when the action succeeded, `false` when the failure
    /// was absorbed into a requeue or dead letter.
    pub async fn run_or_requeue<F, Fut, M>(
        &self,
        kind: &str,
        item: &WorkItem,
        make_retry: impl FnOnce(WorkItem) -> M,
        action: F,
    ) -> Result<bool, BrokerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
        M: Serialize,
    {
        match action().await {
            Ok(()) => Ok(true),
            Err(error) => {
                let next = item.next_attempt();
                if next.context.attempt >= self.broker.max_receive_count() {
                    warn!(
                        kind,
                        attempt = next.context.attempt,
                        %error,
                        "attempts exhausted, dead-lettering item"
                    );
                    self.broker.dead_letter(&self.queue, &make_retry(next)).await?;
                } else {
                    warn!(
                        kind,
                        attempt = next.context.attempt,
                        %error,
                        "action failed, requeueing item"
                    );
                    self.broker.publish(&self.queue, &make_retry(next)).await?;
                }
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutover_config::BrokerConfig;
    use cutover_core::RunId;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize)]
    struct RetryEnvelope {
        kind: String,
        item: WorkItem,
    }

    fn dispatcher(max_receive_count: u32) -> RetryDispatcher {
        let broker = Arc::new(InProcessBroker::new(&BrokerConfig {
            max_receive_count,
            redelivery_initial_delay: Duration::ZERO,
            ..BrokerConfig::default()
        }));
        RetryDispatcher::new(broker, "retries")
    }

    fn wrap(item: WorkItem) -> RetryEnvelope {
        RetryEnvelope {
            kind: "map".to_string(),
            item,
        }
    }

    #[tokio::test]
    async fn test_success_publishes_nothing() {
        let dispatcher = dispatcher(5);
        let item = WorkItem::new(serde_json::json!({"key": "A1"}));

        let ok = dispatcher
            .run_or_requeue("map", &item, wrap, || async { Ok(()) })
            .await
            .unwrap();

        assert!(ok);
        assert!(dispatcher.broker().is_idle("retries").await);
    }

    #[tokio::test]
    async fn test_failure_requeues_original_payload() {
        let dispatcher = dispatcher(5);
        let item = WorkItem::for_run(RunId::new(), serde_json::json!({"key": "A1"}));

        let ok = dispatcher
            .run_or_requeue("map", &item, wrap, || async { anyhow::bail!("store down") })
            .await
            .unwrap();
        assert!(!ok);

        let msg = dispatcher.broker().receive("retries").await.unwrap();
        let envelope: RetryEnvelope = serde_json::from_value(msg.body).unwrap();
        assert_eq!(envelope.kind, "map");
        assert_eq!(envelope.item.payload, item.payload);
        assert_eq!(envelope.item.context.run_id, item.context.run_id);
        assert_eq!(envelope.item.context.attempt, 1);
    }

    #[tokio::test]
    async fn test_exhausted_item_is_dead_lettered() {
        let dispatcher = dispatcher(2);
        let mut item = WorkItem::new(serde_json::json!({"key": "A1"}));
        item.context.attempt = 1; // next attempt hits the cap

        let ok = dispatcher
            .run_or_requeue("map", &item, wrap, || async { anyhow::bail!("still down") })
            .await
            .unwrap();

        assert!(!ok);
        assert!(dispatcher.broker().is_idle("retries").await);
        assert_eq!(dispatcher.broker().dead_letter_count("retries").await, 1);
    }
}
