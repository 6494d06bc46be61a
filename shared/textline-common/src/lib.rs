//! Textline Common Library
//!
//! Conversation and reply types shared by the server and any tooling that
//! reads its stored history.

pub mod types;

pub use types::*;
