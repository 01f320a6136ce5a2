//! Conversation state owned by one loop.

pub mod conversation;

pub use conversation::Conversation;
