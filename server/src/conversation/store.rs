//! Conversation store over a [`KvStore`] backend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use textline_common::{ConversationMessage, ConversationSession, Identity};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{ConversationStats, KvStore, StoreError};
use crate::config::ConversationConfig;

/// Per-identity bounded history with lazy expiry.
///
/// A session whose `last_updated` is older than the TTL is treated as absent
/// and deleted on the next read. Appends for one identity are serialized
/// within this process; across replicas the last write wins.
#[derive(Clone)]
pub struct ConversationStore {
    backend: Arc<dyn KvStore>,
    key_prefix: Arc<str>,
    max_window: usize,
    ttl: chrono::Duration,
    append_locks: Arc<DashMap<Identity, Arc<Mutex<()>>>>,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn KvStore>, config: &ConversationConfig) -> Self {
        Self {
            backend,
            key_prefix: Arc::from(config.key_prefix.as_str()),
            max_window: config.max_window.max(1),
            ttl: config.ttl(),
            append_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn key(&self, identity: &Identity) -> String {
        format!("{}:{}", self.key_prefix, identity)
    }

    fn is_expired(&self, session: &ConversationSession, now: DateTime<Utc>) -> bool {
        now - session.last_updated > self.ttl
    }

    async fn fetch(&self, key: &str) -> Result<Option<ConversationSession>, StoreError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    /// Load the current session for `identity`.
    pub async fn load(&self, identity: &Identity) -> Result<ConversationSession, StoreError> {
        self.load_at(identity, Utc::now()).await
    }

    /// Load the session as of `now`, deleting it if it has expired.
    #[tracing::instrument(skip(self, identity, now), fields(identity = %identity.masked()))]
    pub async fn load_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<ConversationSession, StoreError> {
        let key = self.key(identity);
        match self.fetch(&key).await? {
            Some(session) if self.is_expired(&session, now) => {
                debug!("Session expired, discarding");
                if let Err(e) = self.backend.delete(&key).await {
                    warn!(
                        kind = "store_write",
                        error = %e,
                        "Failed to delete expired session"
                    );
                }
                Ok(ConversationSession::empty(identity.clone(), now))
            }
            Some(session) => Ok(session),
            None => Ok(ConversationSession::empty(identity.clone(), now)),
        }
    }

    /// Append one message and persist the bounded session.
    pub async fn append(
        &self,
        identity: &Identity,
        message: ConversationMessage,
    ) -> Result<ConversationSession, StoreError> {
        self.append_at(identity, message, Utc::now()).await
    }

    /// Append as of `now`. The stored session keeps the newest `max_window`
    /// messages and its `last_updated` becomes `now`.
    #[tracing::instrument(skip(self, identity, message, now), fields(identity = %identity.masked()))]
    pub async fn append_at(
        &self,
        identity: &Identity,
        message: ConversationMessage,
        now: DateTime<Utc>,
    ) -> Result<ConversationSession, StoreError> {
        let lock = self
            .append_locks
            .entry(identity.clone())
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.write_appended(identity, message, now).await
        };
        drop(lock);
        self.release_slot(identity);
        result
    }

    async fn write_appended(
        &self,
        identity: &Identity,
        message: ConversationMessage,
        now: DateTime<Utc>,
    ) -> Result<ConversationSession, StoreError> {
        let mut session = match self.load_at(identity, now).await {
            Ok(session) => session,
            Err(StoreError::Corrupt { key, source }) => {
                warn!(
                    kind = "store_read",
                    %key,
                    error = %source,
                    "Replacing unreadable session record"
                );
                ConversationSession::empty(identity.clone(), now)
            }
            Err(e) => return Err(e),
        };

        session.push_bounded(message, self.max_window);
        session.last_updated = now;

        let encoded = serde_json::to_string(&session).map_err(StoreError::Encode)?;
        let ttl = self.ttl.to_std().ok();
        self.backend.put(&self.key(identity), encoded, ttl).await?;

        debug!(message_count = session.messages.len(), "Session updated");
        Ok(session)
    }

    /// Drop the append slot for `identity` unless another append holds it.
    fn release_slot(&self, identity: &Identity) {
        self.append_locks
            .remove_if(identity, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Remove the session for `identity`. Clearing an absent session succeeds.
    pub async fn clear(&self, identity: &Identity) -> Result<(), StoreError> {
        self.release_slot(identity);
        self.backend.delete(&self.key(identity)).await
    }

    /// Summary for `identity`. Never fails and never mutates; backend errors
    /// are logged and reported as a missing session.
    pub async fn stats(&self, identity: &Identity) -> ConversationStats {
        self.stats_at(identity, Utc::now()).await
    }

    pub async fn stats_at(&self, identity: &Identity, now: DateTime<Utc>) -> ConversationStats {
        match self.fetch(&self.key(identity)).await {
            Ok(Some(session)) if !self.is_expired(&session, now) => ConversationStats {
                message_count: session.messages.len(),
                exists: true,
                last_updated: Some(session.last_updated),
            },
            Ok(_) => ConversationStats::default(),
            Err(e) => {
                warn!(
                    kind = "store_read",
                    identity = %identity.masked(),
                    error = %e,
                    "Failed to read session stats"
                );
                ConversationStats::default()
            }
        }
    }

    /// Delete every expired or unreadable session the backend reports as a
    /// sweep candidate. Returns the number removed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let prefix = format!("{}:", self.key_prefix);
        let mut removed = 0;

        for key in self.backend.sweep_candidates(&prefix).await? {
            let stale = match self.fetch(&key).await {
                Ok(Some(session)) => self.is_expired(&session, now),
                Ok(None) => false,
                Err(StoreError::Corrupt { .. }) => true,
                Err(e) => return Err(e),
            };
            if stale {
                self.backend.delete(&key).await?;
                removed += 1;
            }
        }

        // Drop lock slots nobody is waiting on
        self.append_locks
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        Ok(removed)
    }
}
