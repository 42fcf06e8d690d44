//! Telemetry recorder seam
//!
//! The engine names events ("<domain>-migration-duplicate",
//! "<domain>-reconcile-error") and attaches a property bag; what a backend
//! does with them is not the engine's concern.

use std::sync::Mutex;

/// Sink for named telemetry events
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: &str, properties: &[(&str, String)]);
}

/// Default recorder: emits events as structured tracing records
#[derive(Debug, Default)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn record(&self, event: &str, properties: &[(&str, String)]) {
        tracing::info!(
            target: "cutover::telemetry",
            event = event,
            properties = ?properties,
            "telemetry event"
        );
    }
}

/// Recorder that keeps events in memory for assertions in tests
#[derive(Debug, Default)]
pub struct CapturingRecorder {
    events: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl CapturingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.events.lock().unwrap().clone()
    }

    /// Names of recorded events, in order
    pub fn event_names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl EventRecorder for CapturingRecorder {
    fn record(&self, event: &str, properties: &[(&str, String)]) {
        let props = properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.events.lock().unwrap().push((event.to_string(), props));
    }
}
