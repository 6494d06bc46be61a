//! HMAC-SHA1 Webhook Signature Verification
//!
//! Verifies that an inbound SMS webhook was sent by the telephony provider.
//! The signed payload is the request URL followed by the form parameters,
//! sorted by name and form-urlencoded in that order.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::form_urlencoded;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the provider's signature.
pub const SIGNATURE_HEADER: &str = "X-Twilio-Signature";

/// Build the string that gets signed: URL plus sorted, encoded parameters.
pub fn signing_payload(url: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();

    let mut payload = String::from(url);
    if !sorted.is_empty() {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in sorted {
            serializer.append_pair(name, value);
        }
        payload.push_str(&serializer.finish());
    }
    payload
}

/// Compute the base64-encoded HMAC-SHA1 signature for a request.
pub fn compute_signature(secret: &str, url: &str, params: &[(String, String)]) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(signing_payload(url, params).as_bytes());
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a provided signature.
///
/// Never fails: a missing, non-base64 or mismatching signature yields
/// `false`. The digest comparison is constant-time.
pub fn verify_signature(
    secret: &str,
    url: &str,
    params: &[(String, String)],
    provided: Option<&str>,
) -> bool {
    let Some(provided) = provided.map(str::trim).filter(|s| !s.is_empty()) else {
        return false;
    };
    let Ok(provided) = STANDARD.decode(provided) else {
        return false;
    };
    let Ok(mut mac) = HmacSha1::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signing_payload(url, params).as_bytes());
    mac.verify_slice(&provided).is_ok()
}
