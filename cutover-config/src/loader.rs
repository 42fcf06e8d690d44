//! Configuration loading and environment variable handling

use crate::domains::EngineConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "CUTOVER".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<EngineConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: EngineConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<EngineConfig> {
        let mut config = EngineConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<EngineConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut EngineConfig) -> ConfigResult<()> {
        self.apply_migration_overrides(&mut config.migration)?;
        self.apply_broker_overrides(&mut config.broker)?;
        self.apply_sync_overrides(&mut config.sync)?;
        self.apply_mapping_store_overrides(&mut config.mapping_store)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_migration_overrides(
        &self,
        config: &mut crate::domains::migration::MigrationConfig,
    ) -> ConfigResult<()> {
        if let Ok(page_size) = self.get_env_var("MIGRATION_PAGE_SIZE") {
            config.page_size = page_size
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid MIGRATION_PAGE_SIZE: {}", e)))?;
        }

        if let Ok(concurrency) = self.get_env_var("MIGRATION_WORKER_CONCURRENCY") {
            config.worker_concurrency = concurrency.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid MIGRATION_WORKER_CONCURRENCY: {}", e))
            })?;
        }

        if let Ok(delay) = self.get_env_var("MIGRATION_COMPLETE_CHECK_DELAY_SECONDS") {
            let seconds: u64 = delay.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid MIGRATION_COMPLETE_CHECK_DELAY_SECONDS: {}", e))
            })?;
            config.complete_check_delay = std::time::Duration::from_secs(seconds);
        }

        if let Ok(retry) = self.get_env_var("MIGRATION_COMPLETE_CHECK_RETRY_SECONDS") {
            let seconds: u64 = retry.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid MIGRATION_COMPLETE_CHECK_RETRY_SECONDS: {}", e))
            })?;
            config.complete_check_retry = std::time::Duration::from_secs(seconds);
        }

        if let Ok(count) = self.get_env_var("MIGRATION_COMPLETE_CHECK_COUNT") {
            config.complete_check_count = count.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid MIGRATION_COMPLETE_CHECK_COUNT: {}", e))
            })?;
        }

        Ok(())
    }

    fn apply_broker_overrides(
        &self,
        config: &mut crate::domains::broker::BrokerConfig,
    ) -> ConfigResult<()> {
        if let Ok(count) = self.get_env_var("BROKER_MAX_RECEIVE_COUNT") {
            config.max_receive_count = count.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid BROKER_MAX_RECEIVE_COUNT: {}", e))
            })?;
        }

        Ok(())
    }

    fn apply_sync_overrides(&self, config: &mut crate::domains::sync::SyncConfig) -> ConfigResult<()> {
        if let Ok(identity) = self.get_env_var("SYNC_WRITER_IDENTITY") {
            config.writer_identity = identity;
        }

        if let Ok(disabled) = self.get_env_var("SYNC_DISABLED_EVENTS") {
            config.disabled_events = disabled
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(())
    }

    fn apply_mapping_store_overrides(
        &self,
        config: &mut crate::domains::mapping_store::MappingStoreConfig,
    ) -> ConfigResult<()> {
        if let Ok(base_url) = self.get_env_var("MAPPING_STORE_URL") {
            config.base_url = base_url;
        }

        if let Ok(timeout) = self.get_env_var("MAPPING_STORE_TIMEOUT") {
            let seconds: u64 = timeout
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid MAPPING_STORE_TIMEOUT: {}", e)))?;
            config.timeout = std::time::Duration::from_secs(seconds);
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            use std::str::FromStr;
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            use std::str::FromStr;
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
