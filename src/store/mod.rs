//! Persistence backends for client records.
//!
//! Handlers only see [`ClientStore`]; whether records live in process memory,
//! in SQLite tables or as JSON documents in Redis is decided once at startup.

mod document;
mod memory;
mod sql;

pub use document::RedisClientStore;
pub use memory::InMemoryClientStore;
pub use sql::SqlClientStore;

use crate::error::RegistryError;
use crate::model::{Client, ClientUpdate, NewClient, Page};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Which persistence backend holds the records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sql,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sql" | "sqlite" => Ok(StoreBackend::Sql),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(format!(
                "Unknown store backend '{}'. Must be one of: memory, sql, redis",
                other
            )),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Sql => write!(f, "sql"),
            StoreBackend::Redis => write!(f, "redis"),
        }
    }
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Persist a new client and return it with its assigned id
    async fn create(&self, client: NewClient) -> Result<Client, RegistryError>;

    /// Clients in ascending id order
    async fn list(&self, page: Page) -> Result<Vec<Client>, RegistryError>;

    async fn get(&self, id: u64) -> Result<Option<Client>, RegistryError>;

    /// Apply `changes` and return the updated client, or `None` if absent
    async fn update(&self, id: u64, changes: ClientUpdate)
        -> Result<Option<Client>, RegistryError>;

    /// Returns whether a client was removed
    async fn delete(&self, id: u64) -> Result<bool, RegistryError>;

    async fn ping(&self) -> Result<(), RegistryError>;

    fn backend(&self) -> StoreBackend;
}
