use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::net::SocketAddr;
use tracing::{error, info};

use crate::error::RegistryError;
use crate::model::{Client, ClientCreated, ClientUpdate, NewClient, Page};
use crate::response::{DeleteResponse, ReadinessResponse};
use crate::state::AppState;
use crate::validation::RequestValidator;

fn peer(connect_info: Option<ConnectInfo<SocketAddr>>) -> Option<SocketAddr> {
    connect_info.map(|ConnectInfo(addr)| addr)
}

/// Create a client and announce it
pub async fn create_client(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<NewClient>,
) -> Result<Json<Client>, RegistryError> {
    state.admit(&headers, peer(connect_info))?;
    RequestValidator::validate_new_client(&payload)?;

    let client = state.store.create(payload).await?;
    info!(
        target: "client_registry::handlers",
        client_id = client.id,
        backend = %state.store.backend(),
        "Client created"
    );

    let event = ClientCreated::from(&client);
    match state.notifier.publish(&event).await {
        Ok(()) => state.metrics.record_notification(true),
        Err(err) => {
            state.metrics.record_notification(false);
            error!(
                target: "client_registry::handlers",
                client_id = client.id,
                error = %err,
                "Failed to publish client created event"
            );
            return Err(RegistryError::Notification(err.to_string()));
        }
    }

    Ok(Json(client))
}

/// List clients page by page
pub async fn list_clients(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Client>>, RegistryError> {
    RequestValidator::validate_page(&page)?;
    let clients = state.store.list(page).await?;
    Ok(Json(clients))
}

/// Fetch one client
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Client>, RegistryError> {
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or(RegistryError::ClientNotFound(id))
}

/// Change some fields of a client
pub async fn update_client(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(changes): Json<ClientUpdate>,
) -> Result<Json<Client>, RegistryError> {
    state.admit(&headers, peer(connect_info))?;
    RequestValidator::validate_update(&changes)?;

    let client = state
        .store
        .update(id, changes)
        .await?
        .ok_or(RegistryError::ClientNotFound(id))?;

    info!(target: "client_registry::handlers", client_id = id, "Client updated");
    Ok(Json(client))
}

/// Remove a client
pub async fn delete_client(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<DeleteResponse>, RegistryError> {
    state.admit(&headers, peer(connect_info))?;

    if !state.store.delete(id).await? {
        return Err(RegistryError::ClientNotFound(id));
    }

    info!(target: "client_registry::handlers", client_id = id, "Client deleted");
    Ok(Json(DeleteResponse::deleted()))
}

/// Prometheus scrape endpoint
pub async fn render_metrics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, RegistryError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health.check_health().await)
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.health.check_store().await;

    if store.is_healthy() {
        (StatusCode::OK, Json(ReadinessResponse::ready(store.backend)))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse::not_ready(store.backend, store.error)),
        )
    }
}
