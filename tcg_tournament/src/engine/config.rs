//! Engine configuration.

use crate::tournament::DEFAULT_MATCH_TIME_LIMIT_MINUTES;
use serde::{Deserialize, Serialize};

/// Runtime settings shared by every tournament actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Inbox capacity of each tournament actor
    pub channel_capacity: usize,

    /// Seconds between overtime checks
    pub overtime_check_interval_secs: u64,

    /// Match time limit for tournaments that do not set one
    pub default_match_time_limit_minutes: u32,

    /// Fixed seed for seeding and round-1 shuffles (deterministic runs)
    pub ordering_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
            overtime_check_interval_secs: 30,
            default_match_time_limit_minutes: DEFAULT_MATCH_TIME_LIMIT_MINUTES,
            ordering_seed: None,
        }
    }
}

impl EngineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.channel_capacity == 0 {
            return Err("Channel capacity must be positive".to_string());
        }

        if self.overtime_check_interval_secs == 0 {
            return Err("Overtime check interval must be positive".to_string());
        }

        if self.default_match_time_limit_minutes == 0 {
            return Err("Default match time limit must be positive".to_string());
        }

        Ok(())
    }
}
