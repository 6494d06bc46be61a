//! Webhook payload and error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use thiserror::Error;

use super::{twiml, APOLOGY_REPLY};

/// Form fields of an inbound message webhook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InboundSms {
    pub message_sid: String,
    pub account_sid: String,
    pub from: String,
    pub to: String,
    pub body: String,
    #[serde(default)]
    pub num_media: Option<u32>,
    #[serde(default)]
    pub from_city: Option<String>,
    #[serde(default)]
    pub from_state: Option<String>,
    #[serde(default)]
    pub from_country: Option<String>,
    #[serde(default)]
    pub date_sent: Option<String>,
}

/// Webhook errors.
///
/// Only authentication failures change the status code. Every other failure
/// is answered with `200` and the apology message so the provider does not
/// retry a delivery the sender already saw fail.
#[derive(Debug, Error)]
pub enum SmsError {
    #[error("Webhook authentication failed")]
    Authentication,
    #[error("Malformed webhook: {0}")]
    Malformed(String),
}

impl SmsError {
    /// Value of the `kind` field in failure logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl IntoResponse for SmsError {
    fn into_response(self) -> Response {
        match self {
            Self::Authentication => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            Self::Malformed(_) => {
                twiml::Twiml(twiml::render_text(APOLOGY_REPLY)).into_response()
            }
        }
    }
}
