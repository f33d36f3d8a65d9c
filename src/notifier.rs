//! Announcements sent after a client has been created.

use crate::error::RegistryError;
use crate::model::ClientCreated;
use crate::redis::RedisClient;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: &ClientCreated) -> Result<(), RegistryError>;
}

/// Wire form of an event on the queue: one camelCase JSON object per entry
pub fn queue_payload(event: &ClientCreated) -> Result<String, RegistryError> {
    Ok(serde_json::to_string(event)?)
}

/// Pushes events as JSON onto a Redis list acting as the work queue
pub struct RedisQueueNotifier {
    redis: RedisClient,
    queue: String,
}

impl RedisQueueNotifier {
    pub fn new(redis: RedisClient, queue: impl Into<String>) -> Self {
        Self {
            redis,
            queue: queue.into(),
        }
    }
}

#[async_trait]
impl Notifier for RedisQueueNotifier {
    async fn publish(&self, event: &ClientCreated) -> Result<(), RegistryError> {
        let payload = queue_payload(event)?;
        let depth = self
            .redis
            .rpush(&self.queue, &payload)
            .await
            .map_err(|e| RegistryError::Notification(e.to_string()))?;

        info!(
            target: "client_registry::notifier",
            queue = %self.queue,
            event_id = %event.event_id,
            client_id = event.client_id,
            depth,
            "Published client created event"
        );
        Ok(())
    }
}

/// Only logs the event. Used outside production.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, event: &ClientCreated) -> Result<(), RegistryError> {
        info!(
            target: "client_registry::notifier",
            event_id = %event.event_id,
            client_id = event.client_id,
            "{}",
            event.message
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{sample_new_client, Client};
    use chrono::Utc;

    #[test]
    fn test_queue_payload_decodes_to_the_same_event() {
        let client = Client::from_new(9, Utc::now(), sample_new_client("Acme"));
        let event = ClientCreated::from(&client);

        let payload = queue_payload(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["clientId"], 9);
        assert_eq!(value["postalCode"], "75001");

        let decoded: ClientCreated = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded, event);
    }

    #[tokio::test]
    async fn test_log_notifier_accepts_events() {
        let client = Client::from_new(1, Utc::now(), sample_new_client("Acme"));
        let event = ClientCreated::from(&client);
        assert!(LogNotifier.publish(&event).await.is_ok());
    }
}
