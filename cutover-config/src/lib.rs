//! Domain-driven configuration management for the cutover engine
//!
//! Configuration is split by functional domain, with validation, defaults,
//! and environment variable support.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    broker::BrokerConfig, logging::LoggingConfig, mapping_store::MappingStoreConfig,
    migration::MigrationConfig, sync::SyncConfig, EngineConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
