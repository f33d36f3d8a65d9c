use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed-window throttle settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Length of one counting window
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// Attempts admitted per key per window
    pub threshold: u32,
    /// How long an idle, expired entry is kept before a sweep evicts it
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            threshold: 5,
            retention: Duration::from_secs(300),
        }
    }
}

impl RateLimitConfig {
    /// Create a config with the default retention
    pub fn new(window: Duration, threshold: u32) -> Self {
        Self {
            window,
            threshold,
            retention: Self::default().retention.max(window),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Validate rule parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.threshold == 0 {
            return Err("Throttle threshold must be greater than 0".to_string());
        }
        if self.window.is_zero() {
            return Err("Throttle window must be greater than 0".to_string());
        }
        if self.retention < self.window {
            return Err("Throttle retention must not be shorter than the window".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.threshold, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(RateLimitConfig::new(Duration::from_secs(60), 0).validate().is_err());
        assert!(RateLimitConfig::new(Duration::ZERO, 5).validate().is_err());
        assert!(RateLimitConfig::new(Duration::from_secs(60), 5)
            .with_retention(Duration::from_secs(30))
            .validate()
            .is_err());
    }

    #[test]
    fn test_new_keeps_retention_at_least_window() {
        let config = RateLimitConfig::new(Duration::from_secs(900), 5);
        assert_eq!(config.retention, Duration::from_secs(900));
    }

    #[test]
    fn test_humantime_serialization() {
        let json = serde_json::to_value(RateLimitConfig::default()).unwrap();
        assert_eq!(json["window"], "1m");
        assert_eq!(json["retention"], "5m");
        assert_eq!(json["threshold"], 5);
    }
}
