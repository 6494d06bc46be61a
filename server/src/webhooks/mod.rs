//! Inbound Webhook Authenticity
//!
//! HMAC verification of telephony-provider webhooks. The boolean result of
//! [`signing::verify_signature`] is the only authority for rejecting inbound
//! traffic at the edge.

pub mod signing;
