//! Batch migration configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Batch migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Ids fetched from Legacy per enumeration page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum concurrently-delivered work items per consumer.
    /// This is the backpressure bound protecting Legacy and Target.
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Delay before the first completion check after fan-out
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_complete_check_delay")]
    pub complete_check_delay: Duration,

    /// Spacing between subsequent completion checks
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_complete_check_retry")]
    pub complete_check_retry: Duration,

    /// Consecutive stable checks required to declare a run complete when
    /// the count never reaches the estimate
    #[serde(default = "default_complete_check_count")]
    pub complete_check_count: u32,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            worker_concurrency: default_worker_concurrency(),
            complete_check_delay: default_complete_check_delay(),
            complete_check_retry: default_complete_check_retry(),
            complete_check_count: default_complete_check_count(),
        }
    }
}

impl Validatable for MigrationConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.page_size, "page_size", self.domain_name())?;
        validate_positive(self.worker_concurrency, "worker_concurrency", self.domain_name())?;
        validate_positive(
            self.complete_check_retry.as_secs(),
            "complete_check_retry",
            self.domain_name(),
        )?;
        validate_positive(
            self.complete_check_count,
            "complete_check_count",
            self.domain_name(),
        )?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "migration"
    }
}

// Default value functions
fn default_page_size() -> u32 {
    500
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_complete_check_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_complete_check_retry() -> Duration {
    Duration::from_secs(10)
}

fn default_complete_check_count() -> u32 {
    3
}
