//! Conversation History
//!
//! Durable, per-identity, bounded message logs with lazy time-based expiry.
//! Sessions are serialized as JSON and kept in a key-value backend: Redis in
//! production, process memory for development and tests.

pub mod backend;
pub mod redis;
pub mod store;
pub mod sweep;
pub mod types;

pub use backend::{KvStore, MemoryStore};
pub use redis::RedisStore;
pub use store::ConversationStore;
pub use types::*;
