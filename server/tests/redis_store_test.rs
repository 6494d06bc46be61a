//! Conversation store against a live Redis.
//!
//! Requires Redis on localhost:6380:
//! `docker run -d --name textline-test-redis -p 6380:6379 redis:7`

use std::sync::Arc;

use chrono::Utc;
use textline_common::{ConversationMessage, Identity};
use textline_server::config::Config;
use textline_server::conversation::{ConversationStore, RedisStore};
use textline_server::db;

async fn redis_store(max_window: usize) -> ConversationStore {
    let client = db::create_redis_client("redis://localhost:6380")
        .await
        .expect("Failed to connect to test Redis");
    let mut config = Config::default_for_test().conversation;
    config.key_prefix = format!("test:conv:{}", uuid::Uuid::new_v4());
    config.max_window = max_window;
    ConversationStore::new(Arc::new(RedisStore::new(client)), &config)
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_append_load_clear_round_trip() {
    let store = redis_store(3).await;
    let id = Identity::normalize("+15550100").unwrap();

    for i in 0..5 {
        store
            .append(&id, ConversationMessage::user(format!("m{i}"), Utc::now()))
            .await
            .unwrap();
    }

    let session = store.load(&id).await.unwrap();
    let contents: Vec<_> = session.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["m2", "m3", "m4"]);

    let stats = store.stats(&id).await;
    assert!(stats.exists);
    assert_eq!(stats.message_count, 3);

    store.clear(&id).await.unwrap();
    assert!(store.load(&id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_expired_session_loads_empty() {
    let store = redis_store(20).await;
    let id = Identity::normalize("+15550101").unwrap();
    let t0 = Utc::now();

    store
        .append_at(&id, ConversationMessage::user("old", t0), t0)
        .await
        .unwrap();

    let later = t0 + chrono::Duration::hours(25);
    assert!(store.load_at(&id, later).await.unwrap().is_empty());
    assert!(!store.stats(&id).await.exists);
}
