//! Semaphore-bounded consumer loop
//!
//! One consumer per subscription; the semaphore caps concurrently-delivered
//! messages and is the backpressure mechanism protecting Legacy and Target
//! during a bulk migration.

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::queue::{InProcessBroker, MessageHandler};

/// Handle to a running consumer; dropping it also shuts the loop down
pub struct ConsumerHandle {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl ConsumerHandle {
    /// Signal the consumer to stop and wait for the loop to exit.
    /// Already-dispatched handlers run to completion — cancellation of
    /// in-flight work is cooperative, never forced.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

/// Spawn a consumer pulling from `queue`, dispatching at most
/// `concurrency` handlers at a time
pub fn spawn_consumer<H>(
    broker: Arc<InProcessBroker>,
    queue: impl Into<String>,
    handler: Arc<H>,
    concurrency: usize,
) -> ConsumerHandle
where
    H: MessageHandler + 'static,
{
    let queue = queue.into();
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        info!(queue = %queue, concurrency, "consumer started");

        loop {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let msg = tokio::select! {
                _ = shutdown_rx.changed() => break,
                msg = broker.next_message(&queue) => msg,
            };

            let broker = broker.clone();
            let handler = handler.clone();
            let queue = queue.clone();
            tokio::spawn(async move {
                match handler.handle(msg.body.clone()).await {
                    Ok(()) => broker.ack(&queue).await,
                    Err(error) => {
                        warn!(queue = %queue, message_id = %msg.id, %error, "handler failed");
                        broker.retry_or_dead_letter(&queue, msg).await;
                    }
                }
                drop(permit);
            });
        }

        info!("consumer stopped");
    });

    ConsumerHandle { handle, shutdown }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cutover_config::BrokerConfig;
    use serde_json::Value as JsonValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counter {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl MessageHandler for Counter {
        async fn handle(&self, _body: JsonValue) -> anyhow::Result<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_consumer_processes_published_messages() {
        let broker = Arc::new(InProcessBroker::new(&BrokerConfig::default()));
        let handler = Arc::new(Counter {
            seen: AtomicUsize::new(0),
        });

        let consumer = spawn_consumer(broker.clone(), "work", handler.clone(), 2);

        for i in 0..5 {
            broker.publish("work", &serde_json::json!({"id": i})).await.unwrap();
        }

        // Wait for the queue to drain
        for _ in 0..100 {
            if broker.is_idle("work").await && handler.seen.load(Ordering::SeqCst) == 5 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(handler.seen.load(Ordering::SeqCst), 5);
        consumer.stop().await;
    }
}
