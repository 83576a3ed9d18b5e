//! Append-only conversation log

use crate::llm::LlmMessage;
use serde::{Deserialize, Serialize};

/// One turn of the exchange: user, assistant, tool result or leading system prompt
pub type ConversationEntry = LlmMessage;

/// Ordered conversation history; entries are never reordered or removed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the end of the log
    pub fn append(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    /// Read-only view of every entry, in append order
    pub fn snapshot(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a ConversationLog {
    type Item = &'a ConversationEntry;
    type IntoIter = std::slice::Iter<'a, ConversationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
