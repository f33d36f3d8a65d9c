use envconfig::Envconfig;
use std::net::SocketAddr;
use std::time::Duration;

use crate::config_validator::ConfigValidator;
use crate::error::RegistryError;
use crate::key_generator::KeyStrategy;
use crate::rate_limit_config::RateLimitConfig;
use crate::store::StoreBackend;

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "127.0.0.1:8000")]
    pub bind_addr: SocketAddr,

    /// Deployment environment; notifications go to the queue only in production
    #[envconfig(from = "APP_ENV", default = "development")]
    pub environment: String,

    /// Persistence backend for client records
    #[envconfig(from = "STORE_BACKEND", default = "memory")]
    pub store_backend: StoreBackend,

    /// SQLite database for the sql backend
    #[envconfig(from = "DATABASE_URL", default = "sqlite://client_registry.db")]
    pub database_url: String,

    /// Redis connection URL
    #[envconfig(from = "REDIS_URL", default = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Prefix for every key the document store writes
    #[envconfig(from = "REDIS_KEY_PREFIX", default = "client_registry")]
    pub redis_key_prefix: String,

    /// Queue receiving client created events
    #[envconfig(from = "NOTIFICATION_QUEUE", default = "client_queue")]
    pub notification_queue: String,

    /// Throttle window length in seconds
    #[envconfig(from = "THROTTLE_WINDOW_SECS", default = "60")]
    pub throttle_window_secs: u64,

    /// Attempts admitted per client address per window
    #[envconfig(from = "THROTTLE_THRESHOLD", default = "5")]
    pub throttle_threshold: u32,

    /// Idle time before an expired throttle entry may be evicted
    #[envconfig(from = "THROTTLE_RETENTION_SECS", default = "300")]
    pub throttle_retention_secs: u64,

    /// Throttle sweep interval in seconds
    #[envconfig(from = "CLEANUP_INTERVAL", default = "300")]
    pub cleanup_interval_secs: u64,

    /// Key the throttle on proxy headers instead of the socket peer
    #[envconfig(from = "TRUST_FORWARDED_HEADERS", default = "false")]
    pub trust_forwarded_headers: bool,

    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Config::init_from_env()
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::new(
            Duration::from_secs(self.throttle_window_secs),
            self.throttle_threshold,
        )
        .with_retention(Duration::from_secs(self.throttle_retention_secs))
    }

    pub fn key_strategy(&self) -> KeyStrategy {
        if self.trust_forwarded_headers {
            KeyStrategy::ForwardedHeaders
        } else {
            KeyStrategy::PeerAddress
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Check that the loaded values make sense together
    pub fn validate(&self) -> Result<(), RegistryError> {
        ConfigValidator::validate_environment(&self.environment)?;
        ConfigValidator::validate_cleanup_interval(self.cleanup_interval_secs)?;
        self.rate_limit_config()
            .validate()
            .map_err(RegistryError::Configuration)?;

        if self.store_backend == StoreBackend::Sql {
            ConfigValidator::validate_database_url(&self.database_url)?;
        }

        if self.store_backend == StoreBackend::Redis || self.is_production() {
            ConfigValidator::validate_redis_url(&self.redis_url)?;
            ConfigValidator::validate_queue_name(&self.notification_queue)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::init_from_hashmap(&vars).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.bind_addr, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.database_url, "sqlite://client_registry.db");
        assert_eq!(config.notification_queue, "client_queue");
        assert_eq!(config.rate_limit_config(), RateLimitConfig::default());
        assert_eq!(config.key_strategy(), KeyStrategy::PeerAddress);
        assert!(!config.is_production());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("STORE_BACKEND", "redis"),
            ("APP_ENV", "production"),
            ("THROTTLE_THRESHOLD", "10"),
            ("TRUST_FORWARDED_HEADERS", "true"),
        ]);
        assert_eq!(config.store_backend, StoreBackend::Redis);
        assert!(config.is_production());
        assert_eq!(config.rate_limit_config().threshold, 10);
        assert_eq!(config.key_strategy(), KeyStrategy::ForwardedHeaders);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        assert!(config_from(&[("THROTTLE_THRESHOLD", "0")]).validate().is_err());
        assert!(config_from(&[("APP_ENV", "prod-eu")]).validate().is_err());
        assert!(config_from(&[("STORE_BACKEND", "redis"), ("REDIS_URL", "http://x")])
            .validate()
            .is_err());
    }

    #[test]
    fn test_sql_backend_checks_database_url() {
        let config = config_from(&[("STORE_BACKEND", "sql"), ("DATABASE_URL", "sqlite::memory:")]);
        assert_eq!(config.store_backend, StoreBackend::Sql);
        assert!(config.validate().is_ok());

        let config = config_from(&[("STORE_BACKEND", "sql"), ("DATABASE_URL", "mysql://db/clients")]);
        assert!(config.validate().is_err());

        // Only the sql backend reads it.
        assert!(config_from(&[("DATABASE_URL", "mysql://db/clients")]).validate().is_ok());
    }

    #[test]
    fn test_unknown_backend_fails_to_load() {
        let vars: HashMap<String, String> =
            [("STORE_BACKEND".to_string(), "mongo".to_string())].into();
        assert!(Config::init_from_hashmap(&vars).is_err());
    }
}
