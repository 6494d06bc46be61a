//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router with an in-memory history backend and a scripted generator, plus
//! helpers for signing webhook requests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use textline_common::Identity;
use textline_server::api::{create_router, AppState};
use textline_server::config::Config;
use textline_server::conversation::{ConversationStore, MemoryStore};
use textline_server::generator::{
    GenerationRequest, GeneratorError, GeneratorInfo, ReplyGenerator,
};
use textline_server::ratelimit::RateLimiter;
use textline_server::webhooks::signing::{compute_signature, SIGNATURE_HEADER};
use tower::ServiceExt;
use url::form_urlencoded;

/// Sender used by default in webhook requests.
pub const SENDER: &str = "+15551234567";

/// Generator that replays queued results, then echoes.
#[derive(Default)]
pub struct MockGenerator {
    queued: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(&self, text: &str) -> &Self {
        self.queued
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
        self
    }

    /// Queue a failure.
    pub fn fail(&self, message: &str) -> &Self {
        self.queued
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ReplyGenerator for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let message = request.message.clone();
        self.requests.lock().unwrap().push(request);

        match self.queued.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(GeneratorError::Malformed(e)),
            None => Ok(format!("You said: {message}")),
        }
    }

    fn describe(&self) -> GeneratorInfo {
        GeneratorInfo {
            provider: "mock".into(),
            model: "mock-1".into(),
            capabilities: Vec::new(),
        }
    }
}

/// Full router plus handles on its state.
pub struct TestApp {
    pub router: Router,
    pub store: ConversationStore,
    pub generator: Arc<MockGenerator>,
    pub config: Arc<Config>,
}

impl TestApp {
    /// Create a test app with the default test configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default_for_test())
    }

    /// Create a test app with a custom config (for limit testing).
    pub fn with_config(config: Config) -> Self {
        let store = ConversationStore::new(Arc::new(MemoryStore::new()), &config.conversation);
        let limiter = RateLimiter::new(config.rate_limit.clone());
        let generator = Arc::new(MockGenerator::new());

        let state = AppState::new(config.clone(), store.clone(), limiter, generator.clone());
        let router = create_router(state);

        Self {
            router,
            store,
            generator,
            config: Arc::new(config),
        }
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Send a correctly signed message from [`SENDER`].
    pub async fn send(&self, body: &str) -> Response<Body> {
        self.oneshot(self.signed_request(&sms_params(SENDER, body)))
            .await
    }

    /// Build a webhook request signed with the configured secret.
    pub fn signed_request(&self, params: &[(String, String)]) -> Request<Body> {
        let secret = self
            .config
            .twilio_auth_token
            .as_deref()
            .expect("test config has a secret");
        let url = self
            .config
            .public_webhook_url
            .as_deref()
            .expect("test config has a public URL");
        let signature = compute_signature(secret, url, params).expect("signature");
        sms_request(params, Some(&signature))
    }

    pub fn sender(&self) -> Identity {
        Identity::normalize(SENDER).unwrap()
    }
}

/// Form fields of an inbound message.
pub fn sms_params(from: &str, body: &str) -> Vec<(String, String)> {
    [
        ("MessageSid", "SM1234567890"),
        ("AccountSid", "AC0987654321"),
        ("From", from),
        ("To", "+15005550006"),
        ("Body", body),
        ("NumMedia", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// POST /sms with the given form fields and optional signature header.
pub fn sms_request(params: &[(String, String)], signature: Option<&str>) -> Request<Body> {
    let body = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/sms")
        .header("host", "sms.example.com")
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn body_to_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8")
}

pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let text = body_to_string(response).await;
    serde_json::from_str(&text).unwrap_or_else(|e| {
        panic!("Failed to parse response as JSON: {e}\nBody: {text}")
    })
}

/// Text of every `<Message>` element, in order.
pub fn messages(xml: &str) -> Vec<String> {
    xml.split("<Message>")
        .skip(1)
        .filter_map(|part| part.split("</Message>").next())
        .map(str::to_string)
        .collect()
}
