//! Shared Types

mod conversation;
mod identity;
mod segment;

pub use conversation::*;
pub use identity::*;
pub use segment::*;
