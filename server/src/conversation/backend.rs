//! Key-value backends for session records.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::StoreError;

/// Minimal durable key-value contract the conversation store needs.
///
/// Values are opaque strings. Visibility of writes may be eventual.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Short backend name for health output and logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value`, optionally asking the backend to expire it after `ttl`.
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Keys under `prefix` that a periodic sweep should inspect.
    ///
    /// Backends that expire entries natively return nothing.
    async fn sweep_candidates(&self, _prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }
}

/// In-process backend. Ignores TTL hints; expiry is enforced by the
/// conversation store on read and by the optional sweep.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: String, _ttl: Option<Duration>) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn sweep_candidates(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }
}
