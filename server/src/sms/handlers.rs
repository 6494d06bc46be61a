//! SMS webhook handler.

use axum::{
    body::Bytes,
    extract::{OriginalUri, State},
    http::{header, HeaderMap, Uri},
};
use uuid::Uuid;

use super::twiml::{self, Twiml};
use super::{InboundRequest, SmsError};
use crate::api::AppState;
use crate::config::Config;
use crate::webhooks::signing::SIGNATURE_HEADER;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// POST /sms
pub async fn receive_sms(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Twiml, SmsError> {
    let correlation_id = header_str(&headers, REQUEST_ID_HEADER)
        .map_or_else(|| Uuid::now_v7().to_string(), str::to_string);

    let request = InboundRequest {
        url: signature_url(&state.config, &headers, &uri),
        signature: header_str(&headers, SIGNATURE_HEADER).map(str::to_string),
        body,
        correlation_id,
    };

    let outcome = state.orchestrator.handle(request).await?;
    Ok(Twiml(twiml::render(&outcome.segments)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// URL the provider signed: the configured public URL, otherwise rebuilt from
/// the forwarded scheme, the `Host` header and the request path.
pub fn signature_url(config: &Config, headers: &HeaderMap, uri: &Uri) -> String {
    if let Some(ref url) = config.public_webhook_url {
        return url.clone();
    }

    let scheme = header_str(headers, "x-forwarded-proto")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = header_str(headers, header::HOST.as_str())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());

    format!("{scheme}://{host}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_public_url_wins() {
        let config = Config::default_for_test();
        let uri: Uri = "/sms".parse().unwrap();
        assert_eq!(
            signature_url(&config, &HeaderMap::new(), &uri),
            "https://sms.example.com/sms"
        );
    }

    #[test]
    fn test_rebuilt_from_forwarded_headers() {
        let mut config = Config::default_for_test();
        config.public_webhook_url = None;

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway.example.org"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        let uri: Uri = "/sms?source=twilio".parse().unwrap();

        assert_eq!(
            signature_url(&config, &headers, &uri),
            "https://gateway.example.org/sms?source=twilio"
        );
    }

    #[test]
    fn test_defaults_to_http() {
        let mut config = Config::default_for_test();
        config.public_webhook_url = None;

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:8080"));
        let uri: Uri = "/sms".parse().unwrap();

        assert_eq!(
            signature_url(&config, &headers, &uri),
            "http://localhost:8080/sms"
        );
    }
}
