//! Conversation history passed to the model on every turn

pub mod log;

pub use log::{ConversationEntry, ConversationLog};
