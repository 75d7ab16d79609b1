//! Conversation History
//!
//! Append-only record of every message a session has exchanged with its
//! remote model. The first two entries are always the priming turn and its
//! acknowledgment. Nothing is ever trimmed or rewritten: the full history is
//! what gets sent on each turn.

use crate::llm::{Message, MessageRole};

/// Average characters per token (rough estimate: 1 token ≈ 4 characters)
const CHARS_PER_TOKEN: usize = 4;

/// Per-message overhead for role and structure, in tokens
const MESSAGE_OVERHEAD_TOKENS: usize = 10;

/// Append-only conversation history
#[derive(Debug, Clone, Default)]
pub struct History {
    /// All messages in the conversation, oldest first
    messages: Vec<Message>,

    /// Current estimated token count
    token_count: usize,
}

impl History {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one request/reply pair
    pub fn record_exchange(&mut self, request: Message, reply: Message) {
        self.push(request);
        self.push(reply);
    }

    fn push(&mut self, message: Message) {
        self.token_count += Self::estimate_tokens(&message);
        self.messages.push(message);
    }

    /// Get all messages in the conversation history
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of stored messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of request/reply pairs after the priming turn
    pub fn exchange_count(&self) -> usize {
        (self.messages.len() / 2).saturating_sub(1)
    }

    /// The most recent assistant reply, if any
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Get the current token estimate
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Estimate the number of tokens in a message
    ///
    /// This is a rough estimate based on character count. Different tokenizers
    /// will produce different results, but it is good enough for logging how
    /// large each request has grown.
    fn estimate_tokens(message: &Message) -> usize {
        message.content.len().div_ceil(CHARS_PER_TOKEN) + MESSAGE_OVERHEAD_TOKENS
    }
}
