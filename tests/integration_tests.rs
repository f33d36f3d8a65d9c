use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use client_registry::clock::ManualClock;
use client_registry::key_generator::{KeyGenerator, KeyStrategy};
use client_registry::metrics::Metrics;
use client_registry::model::ClientCreated;
use client_registry::notifier::{LogNotifier, Notifier};
use client_registry::rate_limit_config::RateLimitConfig;
use client_registry::store::InMemoryClientStore;
use client_registry::{create_app, AppState, RegistryError, RequestThrottle};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn publish(&self, _event: &ClientCreated) -> Result<(), RegistryError> {
        Err(RegistryError::Notification("queue unreachable".to_string()))
    }
}

fn app_with(notifier: Arc<dyn Notifier>, clock: Arc<ManualClock>) -> Router {
    let throttle = RequestThrottle::with_clock(
        RateLimitConfig::new(Duration::from_secs(60), 5),
        clock,
    );
    let state = AppState::new(
        Arc::new(InMemoryClientStore::new()),
        notifier,
        Arc::new(throttle),
        KeyGenerator::new(KeyStrategy::ForwardedHeaders),
        Metrics::new().unwrap(),
    );
    create_app(state)
}

fn test_app() -> Router {
    app_with(Arc::new(LogNotifier), Arc::new(ManualClock::default()))
}

fn client_body(name: &str) -> Value {
    json!({
        "name": name,
        "username": format!("{}-user", name.to_lowercase()),
        "firstName": "Grace",
        "lastName": "Hopper",
        "companyName": "Compilers Inc",
        "postalCode": "10001",
        "city": "New York"
    })
}

fn json_request(method: &str, uri: &str, ip: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bare_request(method: &str, uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create(app: &Router, ip: &str, name: &str) -> axum::response::Response {
    app.clone()
        .oneshot(json_request("POST", "/clients/create", ip, &client_body(name)))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_client_lifecycle() {
    let app = test_app();

    let response = create(&app, "10.0.0.1", "Acme").await;
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    assert_eq!(created["id"], 1);
    assert_eq!(created["name"], "Acme");
    assert_eq!(created["city"], "New York");
    assert!(created["createdAt"].is_string());

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/clients/all", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let all = body_json(response).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/clients/1",
            "10.0.0.1",
            &json!({ "city": "Boston", "postalCode": "02108" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["city"], "Boston");
    assert_eq!(updated["name"], "Acme");

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/client/1", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["postalCode"], "02108");

    let response = app
        .clone()
        .oneshot(bare_request("DELETE", "/clients/1", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["detail"], "Client deleted");

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/client/1", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Client not found");
}

#[tokio::test]
async fn test_list_pagination() {
    let app = test_app();
    for (i, name) in ["A", "B", "C"].iter().enumerate() {
        // Separate addresses keep the throttle out of the way.
        let response = create(&app, &format!("10.0.1.{}", i), name).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/clients/all?skip=1&limit=1", "10.0.0.1"))
        .await
        .unwrap();
    let page = body_json(response).await;
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["name"], "B");

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/clients/all?limit=500", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_throttle_rejects_sixth_mutation_and_recovers() {
    let clock = Arc::new(ManualClock::default());
    let app = app_with(Arc::new(LogNotifier), clock.clone());

    for i in 0..5 {
        let response = create(&app, "10.0.0.1", &format!("Client{}", i)).await;
        assert_eq!(response.status(), StatusCode::OK, "request {} should pass", i);
    }

    clock.advance(Duration::from_secs(5));
    let response = create(&app, "10.0.0.1", "Overflow").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "55");
    let body = body_json(response).await;
    assert_eq!(body["message"], "Too many requests. Try again later.");

    let response = create(&app, "10.0.0.2", "Neighbour").await;
    assert_eq!(response.status(), StatusCode::OK);

    clock.advance(Duration::from_secs(56));
    let response = create(&app, "10.0.0.1", "Later").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reads_are_not_throttled() {
    let app = test_app();
    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(bare_request("GET", "/clients/all", "10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_invalid_payload_is_rejected() {
    let app = test_app();
    let mut body = client_body("Acme");
    body["postalCode"] = json!("!!");

    let response = app
        .clone()
        .oneshot(json_request("POST", "/clients/create", "10.0.0.1", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "validation_error");
}

#[tokio::test]
async fn test_notification_failure_returns_server_error() {
    let app = app_with(Arc::new(FailingNotifier), Arc::new(ManualClock::default()));

    let response = create(&app, "10.0.0.1", "Acme").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The record was written before the queue failed.
    let response = app
        .clone()
        .oneshot(bare_request("GET", "/client/1", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/health", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["dependencies"]["store"]["backend"], "memory");

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/ready", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ready");
}

#[tokio::test]
async fn test_metrics_endpoint_counts_requests() {
    let app = test_app();
    create(&app, "10.0.0.1", "Acme").await;

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/metrics", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("request_count"));
    assert!(text.contains("request_processing_seconds"));
    assert!(text.contains("throttle_decisions_total{decision=\"admitted\"} 1"));
}
