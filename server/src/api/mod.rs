//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::{
    config::Config,
    conversation::ConversationStore,
    generator::ReplyGenerator,
    ratelimit::RateLimiter,
    sms::{self, twiml, SmsOrchestrator},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Conversation history
    pub store: ConversationStore,
    /// Per-sender rate limiter
    pub limiter: RateLimiter,
    /// External reply generator
    pub generator: Arc<dyn ReplyGenerator>,
    /// Webhook pipeline over the components above
    pub orchestrator: SmsOrchestrator,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        config: Config,
        store: ConversationStore,
        limiter: RateLimiter,
        generator: Arc<dyn ReplyGenerator>,
    ) -> Self {
        let config = Arc::new(config);
        let orchestrator = SmsOrchestrator::new(
            config.clone(),
            store.clone(),
            limiter.clone(),
            generator.clone(),
        );
        Self {
            config,
            store,
            limiter,
            generator,
            orchestrator,
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Provider webhook; a panic still answers with the apology
        .route(
            "/sms",
            post(sms::handlers::receive_sms).layer(CatchPanicLayer::custom(apology_on_panic)),
        )
        .route("/health", get(health_check))
        .route("/", get(service_info))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

fn apology_on_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!(kind = "internal", "Webhook handler panicked");
    twiml::Twiml(twiml::render_text(sms::APOLOGY_REPLY)).into_response()
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    service: &'static str,
    /// History backend in use
    store: &'static str,
    /// Whether rate limiting is enabled
    rate_limiting: bool,
}

#[derive(Serialize)]
struct UnhealthyResponse {
    status: &'static str,
    error: &'static str,
}

/// Health check endpoint. Reports unhealthy when the configuration does not
/// validate.
async fn health_check(State(state): State<AppState>) -> Response {
    if let Err(e) = state.config.validate() {
        warn!(error = %e, "Health check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(UnhealthyResponse {
                status: "unhealthy",
                error: "Configuration invalid",
            }),
        )
            .into_response();
    }

    Json(HealthResponse {
        status: "healthy",
        service: "textline",
        store: state.store.backend_name(),
        rate_limiting: state.config.rate_limit.enabled,
    })
    .into_response()
}

/// Static service descriptor.
#[derive(Serialize)]
struct ServiceInfo {
    service: &'static str,
    version: &'static str,
    status: &'static str,
}

async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "textline",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}
