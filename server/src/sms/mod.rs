//! Inbound SMS Webhook
//!
//! Turns a provider webhook into a TwiML reply: authenticate, throttle, run
//! special commands or hand the message to the reply generator, remember the
//! turn and split the answer into outbound segments.

pub mod commands;
pub mod handlers;
pub mod orchestrator;
pub mod sanitize;
pub mod segment;
pub mod twiml;
pub mod types;

pub use orchestrator::{Disposition, InboundRequest, Outcome, SmsOrchestrator};
pub use types::{InboundSms, SmsError};

/// Sent whenever a reply cannot be produced.
pub const APOLOGY_REPLY: &str =
    "I'm sorry, I encountered an error processing your message. Please try again.";

/// Sent for a message with no text.
pub const EMPTY_MESSAGE_REPLY: &str = "I received your message but it appears to be empty. Please send me a text message and I'll be happy to help!";

/// Sent after a reset command.
pub const RESET_CONFIRMATION: &str = "Your conversation history has been cleared. Starting fresh!";

/// Sent to throttled senders when notices are enabled.
pub const THROTTLE_NOTICE: &str =
    "You're sending messages too quickly. Please wait a moment and try again.";
