//! Session Orchestrator
//!
//! Drives one inbound webhook through
//! `received → verified → rate_checked → history_loaded → generating →
//! history_updated → segmented → emitted`. Authentication and malformed
//! payloads end the request with an error; throttling, commands, empty
//! messages and generator failures end it early with a reply.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use textline_common::{ConversationMessage, ConversationSession, Identity, ReplySegment};
use tracing::{debug, field, info, warn, Instrument, Span};
use url::form_urlencoded;

use super::commands::{self, Command};
use super::sanitize::sanitize_body;
use super::segment::segment;
use super::{
    InboundSms, SmsError, APOLOGY_REPLY, EMPTY_MESSAGE_REPLY, RESET_CONFIRMATION, THROTTLE_NOTICE,
};
use crate::config::Config;
use crate::conversation::{ConversationStore, StoreError};
use crate::generator::{GenerationRequest, GeneratorError, ReplyGenerator};
use crate::ratelimit::{RateDecision, RateLimiter};
use crate::webhooks::signing::verify_signature;

/// Lifecycle stages of an inbound request, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Verified,
    RateChecked,
    HistoryLoaded,
    Generating,
    HistoryUpdated,
    Segmented,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Verified => "verified",
            Self::RateChecked => "rate_checked",
            Self::HistoryLoaded => "history_loaded",
            Self::Generating => "generating",
            Self::HistoryUpdated => "history_updated",
            Self::Segmented => "segmented",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw webhook as received over HTTP.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// URL the provider signed
    pub url: String,
    pub signature: Option<String>,
    /// Form-encoded body
    pub body: Bytes,
    pub correlation_id: String,
}

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Generator reply delivered
    Replied,
    Command(Command),
    EmptyMessage,
    Throttled,
    /// Generator failed; apology delivered
    Degraded,
}

/// Result of a handled request: what happened and what to send back.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub disposition: Disposition,
    pub segments: Vec<ReplySegment>,
}

#[derive(Clone)]
pub struct SmsOrchestrator {
    config: Arc<Config>,
    store: ConversationStore,
    limiter: RateLimiter,
    generator: Arc<dyn ReplyGenerator>,
}

impl SmsOrchestrator {
    pub fn new(
        config: Arc<Config>,
        store: ConversationStore,
        limiter: RateLimiter,
        generator: Arc<dyn ReplyGenerator>,
    ) -> Self {
        Self {
            config,
            store,
            limiter,
            generator,
        }
    }

    /// Handle one inbound webhook.
    #[tracing::instrument(
        name = "sms.inbound",
        skip_all,
        fields(correlation_id = %request.correlation_id, identity = field::Empty)
    )]
    pub async fn handle(&self, request: InboundRequest) -> Result<Outcome, SmsError> {
        debug!(stage = %Stage::Received, bytes = request.body.len());

        let params: Vec<(String, String)> = form_urlencoded::parse(&request.body)
            .into_owned()
            .collect();
        self.verify(&request, &params)?;

        let sms: InboundSms = serde_urlencoded::from_bytes(&request.body).map_err(|e| {
            let err = SmsError::Malformed(e.to_string());
            warn!(kind = err.kind(), error = %e, "Unreadable webhook payload");
            err
        })?;
        self.check_account(&sms)?;

        let identity = Identity::normalize(&sms.from).ok_or_else(|| {
            let err = SmsError::Malformed("invalid sender address".into());
            warn!(kind = err.kind(), "Webhook sender address has no digits");
            err
        })?;
        Span::current().record("identity", field::display(identity.masked()));
        debug!(stage = %Stage::Verified, message_sid = %sms.message_sid);

        let body = sanitize_body(&sms.body);

        if let RateDecision::Denied {
            window,
            retry_after,
        } = self.limiter.check(&identity)
        {
            info!(
                kind = "rate_limited",
                window = %window,
                retry_after_secs = retry_after.as_secs(),
                "Sender throttled"
            );
            return Ok(self.throttled());
        }
        debug!(stage = %Stage::RateChecked);

        if body.is_empty() {
            return Ok(self.reply(Disposition::EmptyMessage, EMPTY_MESSAGE_REPLY));
        }

        if let Some(command) = Command::parse(&body) {
            info!(%command, "Special command");
            return Ok(self.run_command(command, &identity).await);
        }

        Ok(self.converse(identity, body).await)
    }

    fn verify(&self, request: &InboundRequest, params: &[(String, String)]) -> Result<(), SmsError> {
        if !self.config.webhook_validation_enabled {
            return Ok(());
        }

        let Some(secret) = self.config.twilio_auth_token.as_deref() else {
            warn!(
                kind = SmsError::Authentication.kind(),
                "Webhook secret is not configured"
            );
            return Err(SmsError::Authentication);
        };

        if verify_signature(secret, &request.url, params, request.signature.as_deref()) {
            Ok(())
        } else {
            warn!(
                kind = SmsError::Authentication.kind(),
                url = %request.url,
                signature_present = request.signature.is_some(),
                "Invalid webhook signature"
            );
            Err(SmsError::Authentication)
        }
    }

    fn check_account(&self, sms: &InboundSms) -> Result<(), SmsError> {
        match self.config.twilio_account_sid.as_deref() {
            Some(expected) if expected != sms.account_sid => {
                warn!(
                    kind = SmsError::Authentication.kind(),
                    "Webhook AccountSid mismatch"
                );
                Err(SmsError::Authentication)
            }
            _ => Ok(()),
        }
    }

    fn reply(&self, disposition: Disposition, text: &str) -> Outcome {
        let segments = segment(text, self.config.max_sms_length, self.config.max_sms_segments);
        debug!(stage = %Stage::Segmented, segments = segments.len());
        Outcome {
            disposition,
            segments,
        }
    }

    fn throttled(&self) -> Outcome {
        if self.config.rate_limit.notice_enabled {
            self.reply(Disposition::Throttled, THROTTLE_NOTICE)
        } else {
            Outcome {
                disposition: Disposition::Throttled,
                segments: Vec::new(),
            }
        }
    }

    async fn run_command(&self, command: Command, identity: &Identity) -> Outcome {
        let name = &self.config.agent_name;
        let text = match command {
            Command::Help => commands::help_text(name, &self.generator.describe()),
            Command::Reset => {
                let store = self.store.clone();
                let id = identity.clone();
                match detached(async move { store.clear(&id).await }).await {
                    Ok(()) => RESET_CONFIRMATION.to_string(),
                    Err(e) => {
                        warn!(kind = "store_write", error = %e, "Failed to clear history");
                        APOLOGY_REPLY.to_string()
                    }
                }
            }
            Command::Status => {
                let stats = self.store.stats(identity).await;
                commands::status_text(name, &self.generator.describe(), &stats)
            }
            Command::Info => commands::info_text(name, self.config.conversation.ttl_hours),
        };
        self.reply(Disposition::Command(command), &text)
    }

    async fn converse(&self, identity: Identity, body: String) -> Outcome {
        let session = match self.store.load(&identity).await {
            Ok(session) => session,
            Err(e) => {
                warn!(kind = "store_read", error = %e, "History unavailable, continuing without it");
                ConversationSession::empty(identity.clone(), Utc::now())
            }
        };
        debug!(stage = %Stage::HistoryLoaded, messages = session.messages.len());

        self.remember(&identity, ConversationMessage::user(body.clone(), Utc::now()))
            .await;

        debug!(stage = %Stage::Generating);
        let request = GenerationRequest {
            identity: identity.clone(),
            history: session.messages,
            message: body,
        };
        let limit = self.config.generator.timeout();
        let generated = tokio::time::timeout(limit, self.generator.generate(request))
            .await
            .unwrap_or_else(|_| Err(GeneratorError::Timeout(limit)))
            .and_then(|reply| {
                if reply.trim().is_empty() {
                    Err(GeneratorError::Malformed("empty reply".into()))
                } else {
                    Ok(reply)
                }
            });

        let reply = match generated {
            Ok(reply) => reply,
            Err(e) => {
                warn!(kind = "generator", error = %e, "Reply generation failed");
                return self.reply(Disposition::Degraded, APOLOGY_REPLY);
            }
        };

        self.remember(&identity, ConversationMessage::assistant(reply.clone(), Utc::now()))
            .await;
        debug!(stage = %Stage::HistoryUpdated);

        self.reply(Disposition::Replied, &reply)
    }

    /// Append to history, logging instead of failing.
    async fn remember(&self, identity: &Identity, message: ConversationMessage) {
        let store = self.store.clone();
        let id = identity.clone();
        if let Err(e) = detached(async move { store.append(&id, message).await.map(|_| ()) }).await {
            warn!(kind = "store_write", error = %e, "Failed to update history");
        }
    }
}

/// Run a store write on its own task so it completes even if the caller
/// stops polling.
async fn detached<F, T>(write: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(write.in_current_span())
        .await
        .map_err(|e| StoreError::Backend(format!("store task failed: {e}")))?
}
