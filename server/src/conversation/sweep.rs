//! Periodic removal of expired sessions.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::ConversationStore;

/// Start a background task that sweeps expired sessions every `period`.
///
/// Only useful for backends without native expiry; on Redis each cycle
/// finds nothing to inspect.
pub fn spawn_sweep_task(store: ConversationStore, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // consume immediate first tick
        loop {
            interval.tick().await;
            run_sweep_cycle(&store).await;
        }
    })
}

/// Execute a single sweep cycle.
async fn run_sweep_cycle(store: &ConversationStore) {
    match store.sweep_expired(Utc::now()).await {
        Ok(0) => {}
        Ok(removed) => info!(removed, "Expired conversation sessions swept"),
        Err(e) => warn!(error = %e, "Conversation sweep failed"),
    }
}
