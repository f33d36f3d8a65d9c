use crate::error::RegistryError;
use redis::aio::MultiplexedConnection;
use redis::{Client, FromRedisValue, Pipeline, RedisResult, Script};

/// Shared async Redis connection used by the document store and the queue
#[derive(Clone)]
pub struct RedisClient {
    connection: MultiplexedConnection,
}

impl RedisClient {
    pub async fn connect(redis_url: &str) -> Result<Self, RegistryError> {
        let client = Client::open(redis_url)
            .map_err(|e| RegistryError::Redis(format!("Failed to create Redis client: {}", e)))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RegistryError::Redis(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection })
    }

    pub async fn ping(&self) -> Result<String, RegistryError> {
        let mut conn = self.connection.clone();
        let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        result.map_err(|e| RegistryError::Redis(format!("Ping failed: {}", e)))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, RegistryError> {
        let mut conn = self.connection.clone();
        let result: RedisResult<Option<String>> =
            redis::cmd("GET").arg(key).query_async(&mut conn).await;
        result.map_err(|e| RegistryError::Redis(format!("GET failed: {}", e)))
    }

    pub async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, RegistryError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection.clone();
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }

        let result: RedisResult<Vec<Option<String>>> = cmd.query_async(&mut conn).await;
        result.map_err(|e| RegistryError::Redis(format!("MGET failed: {}", e)))
    }

    pub async fn incr(&self, key: &str) -> Result<u64, RegistryError> {
        let mut conn = self.connection.clone();
        let result: RedisResult<u64> = redis::cmd("INCR").arg(key).query_async(&mut conn).await;
        result.map_err(|e| RegistryError::Redis(format!("INCR failed: {}", e)))
    }

    /// Members ranked `start..=stop` in ascending score order
    pub async fn zrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, RegistryError> {
        let mut conn = self.connection.clone();
        let result: RedisResult<Vec<String>> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await;
        result.map_err(|e| RegistryError::Redis(format!("ZRANGE failed: {}", e)))
    }

    pub async fn rpush(&self, key: &str, value: &str) -> Result<u64, RegistryError> {
        let mut conn = self.connection.clone();
        let result: RedisResult<u64> = redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await;
        result.map_err(|e| RegistryError::Redis(format!("RPUSH failed: {}", e)))
    }

    pub async fn lpop(&self, key: &str) -> Result<Option<String>, RegistryError> {
        let mut conn = self.connection.clone();
        let result: RedisResult<Option<String>> =
            redis::cmd("LPOP").arg(key).query_async(&mut conn).await;
        result.map_err(|e| RegistryError::Redis(format!("LPOP failed: {}", e)))
    }

    /// Send `pipeline` in one round trip. Mark it `atomic()` for MULTI/EXEC.
    pub async fn exec<T: FromRedisValue>(&self, pipeline: &Pipeline) -> Result<T, RegistryError> {
        let mut conn = self.connection.clone();
        let result: RedisResult<T> = pipeline.query_async(&mut conn).await;
        result.map_err(|e| RegistryError::Redis(format!("Pipeline failed: {}", e)))
    }

    /// Run a Lua script server side; EVALSHA first, EVAL on a cache miss
    pub async fn eval<T: FromRedisValue>(
        &self,
        script: &Script,
        keys: &[&str],
        args: &[&str],
    ) -> Result<T, RegistryError> {
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(*key);
        }
        for arg in args {
            invocation.arg(*arg);
        }

        let mut conn = self.connection.clone();
        let result: RedisResult<T> = invocation.invoke_async(&mut conn).await;
        result.map_err(|e| RegistryError::Redis(format!("Script failed: {}", e)))
    }
}
