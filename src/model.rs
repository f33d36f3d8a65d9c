//! Client records and the payloads that create, change and announce them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub postal_code: String,
    pub city: String,
}

/// A stored client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    #[serde(flatten)]
    pub address: Address,
}

impl Client {
    pub fn from_new(id: u64, created_at: DateTime<Utc>, new: NewClient) -> Self {
        Self {
            id,
            created_at,
            name: new.name,
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            company_name: new.company_name,
            address: Address {
                postal_code: new.postal_code,
                city: new.city,
            },
        }
    }

    /// Overwrite every field present in `changes`
    pub fn apply(&mut self, changes: ClientUpdate) {
        let ClientUpdate {
            name,
            username,
            first_name,
            last_name,
            company_name,
            postal_code,
            city,
        } = changes;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(username) = username {
            self.username = username;
        }
        if let Some(first_name) = first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            self.last_name = last_name;
        }
        if let Some(company_name) = company_name {
            self.company_name = company_name;
        }
        if let Some(postal_code) = postal_code {
            self.address.postal_code = postal_code;
        }
        if let Some(city) = city {
            self.address.city = city;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(min = 1, max = 255))]
    pub first_name: String,
    #[validate(length(min = 1, max = 255))]
    pub last_name: String,
    #[validate(length(min = 1, max = 255))]
    pub company_name: String,
    #[validate(length(min = 1, max = 16))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 255))]
    pub city: String,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdate {
    #[validate(length(min = 1, max = 255))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 255))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[validate(length(min = 1, max = 16))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl ClientUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn default_limit() -> usize {
    10
}

/// Offset pagination for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

/// Message published when a client has been created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCreated {
    pub event_id: Uuid,
    pub client_id: u64,
    pub name: String,
    pub city: String,
    pub postal_code: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

impl From<&Client> for ClientCreated {
    fn from(client: &Client) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            client_id: client.id,
            name: client.name.clone(),
            city: client.address.city.clone(),
            postal_code: client.address.postal_code.clone(),
            created_at: client.created_at,
            message: format!(
                "Client created: {} with address: {}, {}",
                client.name, client.address.city, client.address.postal_code
            ),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_new_client(name: &str) -> NewClient {
    NewClient {
        name: name.to_string(),
        username: format!("{}-user", name.to_lowercase()),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        company_name: "Analytical Engines".to_string(),
        postal_code: "75001".to_string(),
        city: "Paris".to_string(),
    }
}
