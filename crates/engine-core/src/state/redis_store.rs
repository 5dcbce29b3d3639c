use crate::{
    error::StateStoreError,
    queue::OutputQueue,
    state::{CheckpointStore, decode},
};
use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use serde_json::{Map, Value as Json};
use std::{collections::BTreeMap, num::NonZeroUsize};
use tracing::info;

/// Checkpoint hashes and queue lists kept in Redis (`HSET`/`RPUSH`/`LPOP`).
/// Several processes can share one server, so `status()` may run next to a
/// running `sync()`.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StateStoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Connected to Redis at {}", url);
        Ok(RedisStore { conn })
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

#[async_trait]
impl CheckpointStore for RedisStore {
    async fn get(&self, key: &str, field: &str) -> Result<Option<Json>, StateStoreError> {
        let raw: Option<Vec<u8>> = self.conn().hget(key, field).await?;
        Ok(raw.map(|raw| decode(&raw)))
    }

    async fn get_all(&self, key: &str) -> Result<Map<String, Json>, StateStoreError> {
        let raw: BTreeMap<String, Vec<u8>> = self.conn().hgetall(key).await?;
        Ok(raw
            .into_iter()
            .map(|(field, value)| (field, decode(&value)))
            .collect())
    }

    async fn set_field(&self, key: &str, field: &str, value: &Json) -> Result<(), StateStoreError> {
        let encoded = serde_json::to_string(value)?;
        let _: () = self.conn().hset(key, field, encoded).await?;
        Ok(())
    }

    async fn set_fields(&self, key: &str, values: &Map<String, Json>) -> Result<(), StateStoreError> {
        if values.is_empty() {
            return Ok(());
        }
        let encoded = values
            .iter()
            .map(|(field, value)| Ok((field.as_str(), serde_json::to_string(value)?)))
            .collect::<Result<Vec<_>, serde_json::Error>>()?;
        let _: () = self.conn().hset_multiple(key, &encoded).await?;
        Ok(())
    }

    async fn has_field(&self, key: &str, field: &str) -> Result<bool, StateStoreError> {
        Ok(self.conn().hexists(key, field).await?)
    }

    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<(), StateStoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let _: () = self.conn().hdel(key, fields).await?;
        Ok(())
    }

    async fn delete_all(&self, key: &str) -> Result<(), StateStoreError> {
        let _: () = self.conn().del(key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StateStoreError> {
        Ok(self.conn().exists(key).await?)
    }
}

#[async_trait]
impl OutputQueue for RedisStore {
    async fn push(&self, key: &str, items: &[String]) -> Result<(), StateStoreError> {
        if items.is_empty() {
            return Ok(());
        }
        let _: () = self.conn().rpush(key, items).await?;
        Ok(())
    }

    async fn len(&self, key: &str) -> Result<u64, StateStoreError> {
        Ok(self.conn().llen(key).await?)
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, StateStoreError> {
        Ok(self.conn().lpop(key, None).await?)
    }

    async fn pop_many(&self, key: &str, count: usize) -> Result<Vec<String>, StateStoreError> {
        let Some(count) = NonZeroUsize::new(count) else {
            return Ok(Vec::new());
        };
        let items: Option<Vec<String>> = self.conn().lpop(key, Some(count)).await?;
        Ok(items.unwrap_or_default())
    }

    async fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>, StateStoreError> {
        Ok(self.conn().lrange(key, start as isize, end as isize).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), StateStoreError> {
        let _: () = self.conn().del(key).await?;
        Ok(())
    }
}
