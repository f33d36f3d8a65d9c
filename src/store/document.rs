use super::{ClientStore, StoreBackend};
use crate::error::RegistryError;
use crate::model::{Client, ClientUpdate, NewClient, Page};
use crate::redis::RedisClient;
use async_trait::async_trait;
use chrono::Utc;
use redis::Script;
use std::fmt;

/// Merges a partial JSON object into the stored document in one step, so a
/// concurrent delete or update cannot interleave between read and write.
/// Returns nil when the document is gone.
const MERGE_DOCUMENT_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
  return false
end

local document = cjson.decode(current)
for field, value in pairs(cjson.decode(ARGV[1])) do
  document[field] = value
end

local updated = cjson.encode(document)
redis.call('SET', KEYS[1], updated)
return updated
"#;

/// Stores each client as a JSON document in Redis.
///
/// Layout under the configured prefix:
/// - `{prefix}:client:next_id` id counter
/// - `{prefix}:client:{id}` the document
/// - `{prefix}:clients` sorted set of ids, scored by id, used for listing
///
/// The document and its index entry are always written and removed together
/// inside MULTI/EXEC.
pub struct RedisClientStore {
    redis: RedisClient,
    prefix: String,
}

impl RedisClientStore {
    pub fn new(redis: RedisClient, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn document_key(&self, id: impl fmt::Display) -> String {
        format!("{}:client:{}", self.prefix, id)
    }

    fn counter_key(&self) -> String {
        format!("{}:client:next_id", self.prefix)
    }

    fn index_key(&self) -> String {
        format!("{}:clients", self.prefix)
    }
}

/// Ranks covered by `page`, or `None` when it selects nothing
fn rank_range(page: Page) -> Option<(isize, isize)> {
    if page.limit == 0 {
        return None;
    }
    let start = isize::try_from(page.skip).ok()?;
    let stop = isize::try_from(page.skip.checked_add(page.limit - 1)?).ok()?;
    Some((start, stop))
}

#[async_trait]
impl ClientStore for RedisClientStore {
    async fn create(&self, client: NewClient) -> Result<Client, RegistryError> {
        let id = self.redis.incr(&self.counter_key()).await?;
        let client = Client::from_new(id, Utc::now(), client);
        let document = serde_json::to_string(&client)?;

        let mut pipeline = redis::pipe();
        pipeline
            .atomic()
            .cmd("SET")
            .arg(self.document_key(id))
            .arg(document)
            .ignore()
            .cmd("ZADD")
            .arg(self.index_key())
            .arg(id)
            .arg(id)
            .ignore();
        self.redis.exec::<()>(&pipeline).await?;

        Ok(client)
    }

    async fn list(&self, page: Page) -> Result<Vec<Client>, RegistryError> {
        let Some((start, stop)) = rank_range(page) else {
            return Ok(Vec::new());
        };

        let ids = self.redis.zrange(&self.index_key(), start, stop).await?;
        let keys: Vec<String> = ids.iter().map(|id| self.document_key(id)).collect();

        let documents = self.redis.mget(&keys).await?;
        let mut clients = Vec::with_capacity(documents.len());
        // A delete between ZRANGE and MGET leaves a hole; skip it.
        for document in documents.into_iter().flatten() {
            clients.push(serde_json::from_str(&document)?);
        }
        Ok(clients)
    }

    async fn get(&self, id: u64) -> Result<Option<Client>, RegistryError> {
        match self.redis.get(&self.document_key(id)).await? {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: u64,
        changes: ClientUpdate,
    ) -> Result<Option<Client>, RegistryError> {
        let key = self.document_key(id);
        let changes = serde_json::to_string(&changes)?;

        let script = Script::new(MERGE_DOCUMENT_SCRIPT);
        let updated: Option<String> = self
            .redis
            .eval(&script, &[key.as_str()], &[changes.as_str()])
            .await?;

        match updated {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: u64) -> Result<bool, RegistryError> {
        let mut pipeline = redis::pipe();
        pipeline
            .atomic()
            .cmd("DEL")
            .arg(self.document_key(id))
            .cmd("ZREM")
            .arg(self.index_key())
            .arg(id);
        let (deleted, _unindexed): (i64, i64) = self.redis.exec(&pipeline).await?;
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<(), RegistryError> {
        self.redis.ping().await.map(|_| ())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Redis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_range() {
        assert_eq!(rank_range(Page { skip: 0, limit: 10 }), Some((0, 9)));
        assert_eq!(rank_range(Page { skip: 5, limit: 1 }), Some((5, 5)));
        assert_eq!(rank_range(Page { skip: 0, limit: 0 }), None);
        assert_eq!(rank_range(Page { skip: usize::MAX, limit: 2 }), None);
    }

    #[test]
    fn test_update_payload_carries_only_given_fields() {
        let changes = ClientUpdate {
            city: Some("Lyon".to_string()),
            ..Default::default()
        };
        let payload = serde_json::to_string(&changes).unwrap();
        assert_eq!(payload, r#"{"city":"Lyon"}"#);
    }
}
