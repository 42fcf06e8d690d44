//! Queued units of migration and retry work

use serde::{Deserialize, Serialize};

use crate::run::RunId;

/// Context travelling with a work item across requeues.
///
/// Retries carry the context forward with only `attempt` incremented, so
/// the payload a handler sees on redelivery is exactly the payload the
/// first attempt saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageContext {
    /// Run this item belongs to, if it came from a batch migration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,

    /// Delivery attempt, 0 for first delivery
    #[serde(default)]
    pub attempt: u32,

    /// Arbitrary telemetry bag propagated into recorded events
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl MessageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_run(run_id: RunId) -> Self {
        Self {
            run_id: Some(run_id),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A message on the work or retry queues: context plus a domain payload.
///
/// Transient and broker-owned. Delivery is at-least-once, so every handler
/// must be idempotent with respect to redelivery of the same item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub context: MessageContext,
    pub payload: serde_json::Value,
}

impl WorkItem {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            context: MessageContext::new(),
            payload,
        }
    }

    pub fn for_run(run_id: RunId, payload: serde_json::Value) -> Self {
        Self {
            context: MessageContext::for_run(run_id),
            payload,
        }
    }

    /// Copy of this item as the next delivery attempt, payload untouched
    pub fn next_attempt(&self) -> Self {
        let mut item = self.clone();
        item.context.attempt += 1;
        item
    }
}
