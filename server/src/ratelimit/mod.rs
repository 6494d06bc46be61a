//! Rate limiting module for protecting against abuse.
//!
//! Bounds how many inbound messages each sender identity may submit within
//! rolling one-minute and one-hour windows. State lives in process memory and
//! is partitioned by identity, so no lock is ever shared across senders.

pub mod config;
pub mod limiter;
pub mod types;

pub use config::*;
pub use limiter::*;
pub use types::*;
