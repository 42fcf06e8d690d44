//! Queue plumbing for the cutover engine
//!
//! Provides the in-process broker (named work/retry queues with receive
//! counts and per-queue dead-letter stores), the semaphore-bounded consumer
//! loop, redelivery backoff, and the [`RetryDispatcher`] run-or-requeue
//! primitive shared by migration and synchronisation.

pub mod backoff;
pub mod consumer;
pub mod error;
pub mod queue;
pub mod retry;

// Re-export commonly used types
pub use backoff::{BackoffCalculator, BackoffStrategy};
pub use consumer::{spawn_consumer, ConsumerHandle};
pub use error::BrokerError;
pub use queue::{InProcessBroker, MessageHandler, QueueMessage};
pub use retry::RetryDispatcher;
