//! Mapping store client configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP mapping store client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingStoreConfig {
    /// Base URL of the mapping store service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_timeout")]
    pub timeout: Duration,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for MappingStoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Validatable for MappingStoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.base_url, "base_url", self.domain_name())?;
        validate_positive(self.timeout.as_secs(), "timeout", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "mapping_store"
    }
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8084".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    "cutover".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_store_config_defaults() {
        let config = MappingStoreConfig::default();
        assert_eq!(config.base_url, "http://localhost:8084");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_url_validation() {
        let mut config = MappingStoreConfig::default();
        config.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
