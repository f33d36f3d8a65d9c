use crate::error::RegistryError;

/// Deployment environments the service knows about
pub const ENVIRONMENTS: [&str; 4] = ["development", "staging", "production", "test"];

/// Validates configuration values for consistency and correctness
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a Redis URL
    pub fn validate_redis_url(url: &str) -> Result<(), RegistryError> {
        if url.is_empty() {
            return Err(RegistryError::Configuration(
                "Redis URL cannot be empty".to_string(),
            ));
        }

        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(RegistryError::Configuration(
                "Redis URL must start with 'redis://' or 'rediss://'".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates a SQLite database URL
    pub fn validate_database_url(url: &str) -> Result<(), RegistryError> {
        if url.trim().is_empty() {
            return Err(RegistryError::Configuration(
                "Database URL cannot be empty".to_string(),
            ));
        }

        if !url.starts_with("sqlite:") {
            return Err(RegistryError::Configuration(
                "Database URL must start with 'sqlite:'".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates environment name
    pub fn validate_environment(env: &str) -> Result<(), RegistryError> {
        if !ENVIRONMENTS.contains(&env.to_lowercase().as_str()) {
            return Err(RegistryError::Configuration(format!(
                "Invalid environment '{}'. Must be one of: {:?}",
                env, ENVIRONMENTS
            )));
        }

        Ok(())
    }

    pub fn validate_queue_name(queue: &str) -> Result<(), RegistryError> {
        if queue.trim().is_empty() {
            return Err(RegistryError::Configuration(
                "Notification queue name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate_cleanup_interval(secs: u64) -> Result<(), RegistryError> {
        if secs == 0 {
            return Err(RegistryError::Configuration(
                "Cleanup interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
