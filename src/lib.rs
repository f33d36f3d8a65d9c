pub mod clock;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod handlers;
pub mod health;
pub mod key_generator;
pub mod metrics;
pub mod middleware;
pub mod model;
pub mod notifier;
pub mod rate_limit_config;
pub mod redis;
pub mod response;
pub mod server;
pub mod state;
pub mod store;
pub mod throttle;
pub mod validation;

pub use config::Config;
pub use error::RegistryError;
pub use server::create_app;
pub use state::AppState;
pub use throttle::{Decision, RequestThrottle, ThrottleEntry, ThrottleError};
