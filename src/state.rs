use axum::http::HeaderMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::health::HealthChecker;
use crate::key_generator::KeyGenerator;
use crate::metrics::Metrics;
use crate::notifier::Notifier;
use crate::store::ClientStore;
use crate::throttle::{Decision, RequestThrottle};

/// Everything a handler needs, cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClientStore>,
    pub notifier: Arc<dyn Notifier>,
    pub throttle: Arc<RequestThrottle>,
    pub key_generator: KeyGenerator,
    pub metrics: Metrics,
    pub health: HealthChecker,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ClientStore>,
        notifier: Arc<dyn Notifier>,
        throttle: Arc<RequestThrottle>,
        key_generator: KeyGenerator,
        metrics: Metrics,
    ) -> Self {
        let health = HealthChecker::new(store.clone());
        Self {
            store,
            notifier,
            throttle,
            key_generator,
            metrics,
            health,
        }
    }

    /// Run the throttle for the requesting client before a mutating call
    pub fn admit(
        &self,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> Result<(), RegistryError> {
        let key = self.key_generator.generate_key(headers, peer);
        let decision = self.throttle.check_now(&key)?;
        self.metrics.record_throttle(decision.is_admitted());

        match decision {
            Decision::Admitted { count, remaining } => {
                debug!(
                    target: "client_registry::throttle",
                    key = %key,
                    count,
                    remaining,
                    "Request admitted"
                );
                Ok(())
            }
            Decision::Rejected {
                count,
                threshold,
                resets_in,
            } => {
                warn!(
                    target: "client_registry::throttle",
                    key = %key,
                    count,
                    threshold,
                    resets_in_ms = resets_in.as_millis() as u64,
                    "Request rejected by throttle"
                );
                Err(RegistryError::RateLimitExceeded {
                    retry_after: resets_in,
                })
            }
        }
    }
}
