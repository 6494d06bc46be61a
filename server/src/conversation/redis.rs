//! Redis backend for session records.
//!
//! Each session is one string key written with `SET .. EX`, so Redis reclaims
//! idle sessions on its own once the history TTL passes.

use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;

use super::{KvStore, StoreError};

/// Session backend on a shared Redis client.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expiration = ttl
            .map(|ttl| ttl.as_secs().max(1))
            .map(|secs| Expiration::EX(secs as i64));
        self.client
            .set::<(), _, _>(key, value, expiration, None, false)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _: i64 = self.client.del(key).await?;
        Ok(())
    }
}
