//! Domain-specific configuration modules

pub mod broker;
pub mod logging;
pub mod mapping_store;
pub mod migration;
pub mod sync;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main engine configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Batch migration configuration
    #[serde(default)]
    pub migration: migration::MigrationConfig,

    /// Broker and redelivery configuration
    #[serde(default)]
    pub broker: broker::BrokerConfig,

    /// Live synchronisation configuration
    #[serde(default)]
    pub sync: sync::SyncConfig,

    /// Mapping store client configuration
    #[serde(default)]
    pub mapping_store: mapping_store::MappingStoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl EngineConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.migration.validate()?;
        self.broker.validate()?;
        self.sync.validate()?;
        self.mapping_store.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = EngineConfig::default();
        serde_yaml::to_string(&config).unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
