//! Live synchronisation configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// Synchronisation event router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Audit originator this engine writes into Legacy. Events carrying it
    /// are our own writes echoed back and must be dropped.
    #[serde(default = "default_writer_identity")]
    pub writer_identity: String,

    /// Whether events without an explicit switch entry are processed
    #[serde(default = "crate::domains::utils::default_true")]
    pub default_enabled: bool,

    /// Disabled `(domain, event)` gates, as `"domain.event_type"` entries
    #[serde(default)]
    pub disabled_events: Vec<String>,

    /// Subscription queue name
    #[serde(default = "default_queue")]
    pub queue: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            writer_identity: default_writer_identity(),
            default_enabled: true,
            disabled_events: Vec::new(),
            queue: default_queue(),
        }
    }
}

impl Validatable for SyncConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.writer_identity, "writer_identity", self.domain_name())?;
        validate_required_string(&self.queue, "queue", self.domain_name())?;

        for entry in &self.disabled_events {
            if !entry.contains('.') {
                return Err(self.validation_error(format!(
                    "disabled_events entry '{}' is not of the form domain.event_type",
                    entry
                )));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "sync"
    }
}

// Default value functions
fn default_writer_identity() -> String {
    "CUTOVER_SYNC".to_string()
}

fn default_queue() -> String {
    "sync-events".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.writer_identity, "CUTOVER_SYNC");
        assert!(config.default_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_events_shape() {
        let mut config = SyncConfig::default();
        config.disabled_events = vec!["alerts.updated".to_string()];
        assert!(config.validate().is_ok());

        config.disabled_events = vec!["alerts".to_string()];
        assert!(config.validate().is_err());
    }
}
