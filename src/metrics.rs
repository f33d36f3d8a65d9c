use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::RegistryError;

/// Prometheus collectors for the registry, owned by the app state
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    request_count: IntCounter,
    request_time: Histogram,
    throttle_decisions: IntCounterVec,
    notifications: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, RegistryError> {
        let registry = Registry::new();

        let request_count = IntCounter::new("request_count", "Total count of requests")?;
        let request_time = Histogram::with_opts(HistogramOpts::new(
            "request_processing_seconds",
            "Time spent processing request",
        ))?;
        let throttle_decisions = IntCounterVec::new(
            Opts::new("throttle_decisions_total", "Throttle checks by outcome"),
            &["decision"],
        )?;
        let notifications = IntCounterVec::new(
            Opts::new("notifications_total", "Client created notifications by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(request_count.clone()))?;
        registry.register(Box::new(request_time.clone()))?;
        registry.register(Box::new(throttle_decisions.clone()))?;
        registry.register(Box::new(notifications.clone()))?;

        Ok(Self {
            registry,
            request_count,
            request_time,
            throttle_decisions,
            notifications,
        })
    }

    pub fn record_request(&self, seconds: f64) {
        self.request_count.inc();
        self.request_time.observe(seconds);
    }

    pub fn record_throttle(&self, admitted: bool) {
        let decision = if admitted { "admitted" } else { "rejected" };
        self.throttle_decisions.with_label_values(&[decision]).inc();
    }

    pub fn record_notification(&self, delivered: bool) {
        let outcome = if delivered { "delivered" } else { "failed" };
        self.notifications.with_label_values(&[outcome]).inc();
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.get()
    }

    /// Content type of [`render`](Self::render) output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Current values in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, RegistryError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| RegistryError::Internal(format!("Metrics are not valid UTF-8: {}", e)))
    }
}

/// Counts and times every request
pub async fn track_metrics(
    State(metrics): State<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let timer = std::time::Instant::now();
    let response = next.run(request).await;
    metrics.record_request(timer.elapsed().as_secs_f64());
    response
}
