// ============================================================
// IMPORT CONFIGURATION
// ============================================================
// Timeouts, pool sizes and retry policy for commit and dispatch

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImportConfig {
    /// Upper bound for a single entity create call (default: 10s)
    #[validate(range(min = 1, max = 600_000))]
    pub entity_timeout_ms: u64,

    /// Property groups committed in parallel (default: 4)
    #[validate(range(min = 1, max = 64))]
    pub max_concurrent_groups: usize,

    /// Upper bound for a single invite send attempt (default: 10s)
    #[validate(range(min = 1, max = 600_000))]
    pub send_timeout_ms: u64,

    /// Workers draining the invite queue (default: 4)
    #[validate(range(min = 1, max = 64))]
    pub dispatch_workers: usize,

    /// Send attempts per invite, first try included (default: 3)
    #[validate(range(min = 1, max = 10))]
    pub dispatch_max_attempts: u32,

    /// Base delay doubled after every failed attempt (default: 250ms)
    #[validate(range(max = 60_000))]
    pub dispatch_backoff_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            entity_timeout_ms: 10_000,
            max_concurrent_groups: 4,
            send_timeout_ms: 10_000,
            dispatch_workers: 4,
            dispatch_max_attempts: 3,
            dispatch_backoff_ms: 250,
        }
    }
}

impl ImportConfig {
    pub fn entity_timeout(&self) -> Duration {
        Duration::from_millis(self.entity_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Delay before retry number `attempt` (1-based count of failures so far).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.dispatch_backoff_ms.saturating_mul(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ImportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrent_groups, 4);
        assert_eq!(config.dispatch_max_attempts, 3);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = ImportConfig {
            dispatch_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_doubles() {
        let config = ImportConfig {
            dispatch_backoff_ms: 100,
            ..Default::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(400));
    }
}
