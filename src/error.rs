use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::throttle::ThrottleError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Client not found")]
    ClientNotFound(u64),
    #[error("Too many requests. Try again later.")]
    RateLimitExceeded { retry_after: Duration },
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Notification error: {0}")]
    Notification(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ThrottleError> for RegistryError {
    fn from(err: ThrottleError) -> Self {
        RegistryError::InvalidRequest(err.to_string())
    }
}

impl From<redis::RedisError> for RegistryError {
    fn from(err: redis::RedisError) -> Self {
        RegistryError::Redis(err.to_string())
    }
}

impl From<sqlx::Error> for RegistryError {
    fn from(err: sqlx::Error) -> Self {
        RegistryError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Internal(format!("Serialization failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for RegistryError {
    fn from(err: validator::ValidationErrors) -> Self {
        RegistryError::Validation(err.to_string())
    }
}

impl From<prometheus::Error> for RegistryError {
    fn from(err: prometheus::Error) -> Self {
        RegistryError::Internal(format!("Metrics error: {}", err))
    }
}

impl RegistryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RegistryError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RegistryError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RegistryError::ClientNotFound(_) => StatusCode::NOT_FOUND,
            RegistryError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            RegistryError::Redis(_) | RegistryError::Database(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RegistryError::Notification(_)
            | RegistryError::Configuration(_)
            | RegistryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code,
        }
    }

    pub fn from_registry_error(err: &RegistryError) -> Self {
        let code = err.status_code().as_u16();
        match err {
            RegistryError::InvalidRequest(msg) => Self::new("bad_request", msg, code),
            RegistryError::Validation(msg) => Self::new("validation_error", msg, code),
            RegistryError::ClientNotFound(_) => Self::new("not_found", "Client not found", code),
            RegistryError::RateLimitExceeded { .. } => {
                Self::new("rate_limit_exceeded", &err.to_string(), code)
            }
            RegistryError::Redis(msg) | RegistryError::Database(msg) => {
                Self::new("service_unavailable", msg, code)
            }
            // Queue failures are logged where they happen; clients get a generic message.
            RegistryError::Notification(_) => {
                Self::new("internal_error", "Internal server error", code)
            }
            RegistryError::Configuration(msg) => Self::new("configuration_error", msg, code),
            RegistryError::Internal(msg) => Self::new("internal_error", msg, code),
        }
    }
}

/// Whole seconds until a retry makes sense, never less than one
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from_registry_error(&self);
        let mut response = (self.status_code(), Json(body)).into_response();

        if let RegistryError::RateLimitExceeded { retry_after } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after)),
            );
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RegistryError::ClientNotFound(3).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RegistryError::Validation("bad".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            RegistryError::RateLimitExceeded { retry_after: Duration::from_secs(5) }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            RegistryError::Database("pool timed out".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_secs(55)), 55);
        assert_eq!(retry_after_secs(Duration::from_millis(54_200)), 55);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn test_rate_limit_response_carries_retry_after() {
        let response = RegistryError::RateLimitExceeded {
            retry_after: Duration::from_secs(42),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_notification_error_hides_details() {
        let body = ErrorResponse::from_registry_error(&RegistryError::Notification(
            "connection refused".into(),
        ));
        assert_eq!(body.code, 500);
        assert!(!body.message.contains("refused"));
    }
}
