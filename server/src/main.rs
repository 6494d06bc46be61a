//! Textline Server - Main Entry Point

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tracing::{info, warn};

use textline_server::{
    api, config,
    conversation::{self, ConversationStore, KvStore, MemoryStore, RedisStore},
    db,
    generator::{CapabilityRegistry, OpenAiGenerator, ReplyGenerator},
    observability,
    ratelimit::RateLimiter,
};

/// Period of the idle rate-limit state cleanup.
const LIMITER_CLEANUP_PERIOD: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    observability::init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;
    config
        .validate()
        .context("Configuration invalid, refusing to start")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Textline Server"
    );

    // Conversation history backend
    let backend: Arc<dyn KvStore> = match config.conversation.redis_url {
        Some(ref url) => Arc::new(RedisStore::new(db::create_redis_client(url).await?)),
        None => {
            warn!("REDIS_URL not set, conversation history is kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let store = ConversationStore::new(backend, &config.conversation);
    info!(
        backend = store.backend_name(),
        max_window = config.conversation.max_window,
        ttl_hours = config.conversation.ttl_hours,
        "Conversation store initialized"
    );

    if config.conversation.sweep_interval_secs > 0 {
        conversation::sweep::spawn_sweep_task(
            store.clone(),
            Duration::from_secs(config.conversation.sweep_interval_secs),
        );
        info!(
            interval_secs = config.conversation.sweep_interval_secs,
            "Conversation sweep enabled"
        );
    }

    // Rate limiter
    let limiter = RateLimiter::new(config.rate_limit.clone());
    if config.rate_limit.enabled {
        limiter.spawn_cleanup_task(LIMITER_CLEANUP_PERIOD);
        info!(
            per_minute = config.rate_limit.limits.per_minute.requests,
            per_hour = config.rate_limit.limits.per_hour.requests,
            "Rate limiter initialized"
        );
    } else {
        info!("Rate limiting disabled by configuration");
    }

    // Reply generator
    let http = reqwest::Client::builder()
        .timeout(config.generator.timeout())
        .build()?;
    let capabilities = CapabilityRegistry::standard(&config.generator, http.clone());
    info!(capabilities = capabilities.len(), "Capabilities registered");
    let generator: Arc<dyn ReplyGenerator> =
        Arc::new(OpenAiGenerator::new(&config, capabilities, http)?);

    // Build application state
    let state = api::AppState::new(config.clone(), store, limiter, generator);

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
