use crate::config::Config;
use crate::error::RegistryError;
use crate::handlers::{
    create_client, delete_client, get_client, health_check, list_clients, readiness_check,
    render_metrics, update_client,
};
use crate::key_generator::KeyGenerator;
use crate::metrics::{track_metrics, Metrics};
use crate::middleware::logging_middleware;
use crate::notifier::{LogNotifier, Notifier, RedisQueueNotifier};
use crate::redis::RedisClient;
use crate::state::AppState;
use crate::store::{
    ClientStore, InMemoryClientStore, RedisClientStore, SqlClientStore, StoreBackend,
};
use crate::throttle::RequestThrottle;
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the router with every route and layer wired to `state`
pub fn create_app(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    Router::new()
        .route("/clients/create", post(create_client))
        .route("/clients/all", get(list_clients))
        .route("/client/:id", get(get_client))
        .route("/clients/:id", put(update_client).delete(delete_client))
        .route("/metrics", get(render_metrics))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn_with_state(metrics, track_metrics))
                .layer(middleware::from_fn(logging_middleware)),
        )
}

/// Assemble application state from configuration, opening the database or
/// connecting to Redis when the store or the notification queue needs it
pub async fn build_state(config: &Config) -> Result<AppState, RegistryError> {
    let needs_redis = config.store_backend == StoreBackend::Redis || config.is_production();
    let redis = if needs_redis {
        Some(RedisClient::connect(&config.redis_url).await?)
    } else {
        None
    };

    let store: Arc<dyn ClientStore> = match (&config.store_backend, &redis) {
        (StoreBackend::Redis, Some(redis)) => Arc::new(RedisClientStore::new(
            redis.clone(),
            config.redis_key_prefix.clone(),
        )),
        (StoreBackend::Sql, _) => Arc::new(SqlClientStore::connect(&config.database_url).await?),
        _ => Arc::new(InMemoryClientStore::new()),
    };

    let notifier: Arc<dyn Notifier> = match (config.is_production(), &redis) {
        (true, Some(redis)) => Arc::new(RedisQueueNotifier::new(
            redis.clone(),
            config.notification_queue.clone(),
        )),
        _ => Arc::new(LogNotifier),
    };

    let throttle = Arc::new(RequestThrottle::new(config.rate_limit_config()));

    Ok(AppState::new(
        store,
        notifier,
        throttle,
        KeyGenerator::new(config.key_strategy()),
        Metrics::new()?,
    ))
}

/// Periodically evict idle throttle entries
pub fn spawn_throttle_sweeper(throttle: Arc<RequestThrottle>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            let evicted = throttle.sweep_now();
            if evicted > 0 {
                tracing::debug!(
                    target: "client_registry::throttle",
                    evicted,
                    remaining = throttle.len(),
                    "Swept idle throttle entries"
                );
            }
        }
    })
}

pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self, RegistryError> {
        config.validate()?;
        let state = build_state(&config).await?;
        Ok(Self { config, state })
    }

    pub async fn run(self) -> Result<(), RegistryError> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                RegistryError::Internal(format!("Failed to bind {}: {}", self.config.bind_addr, e))
            })?;

        let sweeper = spawn_throttle_sweeper(
            self.state.throttle.clone(),
            self.config.cleanup_interval(),
        );

        tracing::info!("Client registry listening on {}", self.config.bind_addr);
        tracing::info!(
            "Store backend: {}, environment: {}",
            self.state.store.backend(),
            self.config.environment
        );
        tracing::info!("Health check available at /health");
        tracing::info!("Readiness check available at /ready");

        let app = create_app(self.state);
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RegistryError::Internal(format!("Server error: {}", e)));

        sweeper.abort();
        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
