//! Per-(domain, event) feature switches

use std::collections::HashSet;

use cutover_config::SyncConfig;
use cutover_core::ChangeEventType;

/// Gates deciding which live events are processed.
///
/// Disabled events are logged and dropped at the router, never queued.
#[derive(Debug, Clone)]
pub struct FeatureSwitches {
    default_enabled: bool,
    disabled: HashSet<String>,
}

impl FeatureSwitches {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            default_enabled: config.default_enabled,
            disabled: config.disabled_events.iter().cloned().collect(),
        }
    }

    pub fn is_enabled(&self, domain: &str, event_type: ChangeEventType) -> bool {
        if self.disabled.contains(&format!("{}.{}", domain, event_type)) {
            return false;
        }
        self.default_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_entry_gates_one_event() {
        let switches = FeatureSwitches::from_config(&SyncConfig {
            disabled_events: vec!["alerts.updated".to_string()],
            ..SyncConfig::default()
        });

        assert!(!switches.is_enabled("alerts", ChangeEventType::Updated));
        assert!(switches.is_enabled("alerts", ChangeEventType::Inserted));
        assert!(switches.is_enabled("locations", ChangeEventType::Updated));
    }

    #[test]
    fn test_default_disabled() {
        let switches = FeatureSwitches::from_config(&SyncConfig {
            default_enabled: false,
            ..SyncConfig::default()
        });

        assert!(!switches.is_enabled("alerts", ChangeEventType::Inserted));
    }
}
