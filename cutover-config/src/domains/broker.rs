//! Broker and redelivery configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Queue broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Deliveries before a message moves to the dead-letter queue
    #[serde(default = "default_max_receive_count")]
    pub max_receive_count: u32,

    /// First redelivery delay. Zero means immediate redelivery, which the
    /// integration tests rely on.
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_redelivery_initial_delay")]
    pub redelivery_initial_delay: Duration,

    /// Redelivery delay cap
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_redelivery_max_delay")]
    pub redelivery_max_delay: Duration,

    /// Exponential multiplier applied per attempt
    #[serde(default = "default_redelivery_multiplier")]
    pub redelivery_multiplier: f64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_receive_count: default_max_receive_count(),
            redelivery_initial_delay: default_redelivery_initial_delay(),
            redelivery_max_delay: default_redelivery_max_delay(),
            redelivery_multiplier: default_redelivery_multiplier(),
        }
    }
}

impl Validatable for BrokerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.max_receive_count, "max_receive_count", self.domain_name())?;

        if self.redelivery_multiplier < 1.0 {
            return Err(self.validation_error(format!(
                "redelivery_multiplier must be at least 1.0, got {}",
                self.redelivery_multiplier
            )));
        }

        if self.redelivery_max_delay < self.redelivery_initial_delay {
            return Err(
                self.validation_error("redelivery_max_delay must not be below redelivery_initial_delay")
            );
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "broker"
    }
}

// Default value functions
fn default_max_receive_count() -> u32 {
    5
}

fn default_redelivery_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_redelivery_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_redelivery_multiplier() -> f64 {
    2.0
}
