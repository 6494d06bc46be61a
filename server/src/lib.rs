//! Textline Server
//!
//! SMS webhook gateway for a conversational assistant: verifies provider
//! webhooks, throttles senders, remembers a bounded per-sender history and
//! splits generated replies into SMS-sized segments.

pub mod api;
pub mod config;
pub mod conversation;
pub mod db;
pub mod generator;
pub mod observability;
pub mod ratelimit;
pub mod sms;
pub mod webhooks;
