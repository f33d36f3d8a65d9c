use super::{ClientStore, StoreBackend};
use crate::error::RegistryError;
use crate::model::{Client, ClientUpdate, NewClient, Page};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

struct Table {
    next_id: u64,
    rows: BTreeMap<u64, Client>,
}

/// Process-local store. Ids start at 1 and are never reused.
pub struct InMemoryClientStore {
    table: RwLock<Table>,
}

impl InMemoryClientStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }
}

impl Default for InMemoryClientStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn create(&self, client: NewClient) -> Result<Client, RegistryError> {
        let mut table = self.table.write().await;
        let id = table.next_id;
        table.next_id += 1;

        let client = Client::from_new(id, Utc::now(), client);
        table.rows.insert(id, client.clone());
        Ok(client)
    }

    async fn list(&self, page: Page) -> Result<Vec<Client>, RegistryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .skip(page.skip)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn get(&self, id: u64) -> Result<Option<Client>, RegistryError> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn update(
        &self,
        id: u64,
        changes: ClientUpdate,
    ) -> Result<Option<Client>, RegistryError> {
        let mut table = self.table.write().await;
        Ok(table.rows.get_mut(&id).map(|client| {
            client.apply(changes);
            client.clone()
        }))
    }

    async fn delete(&self, id: u64) -> Result<bool, RegistryError> {
        let mut table = self.table.write().await;
        Ok(table.rows.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), RegistryError> {
        Ok(())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}
