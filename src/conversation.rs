//! Conversation payloads
//!
//! What the client sends in, and what is forwarded upstream.

use serde::{Deserialize, Serialize};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Inbound chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRequest {
    pub messages: Vec<Message>,
}

/// Body posted to the upstream inference endpoint
#[derive(Debug, Serialize)]
pub struct UpstreamChatRequest<'a> {
    pub stream: bool,
    pub model: &'a str,
    pub messages: &'a [Message],
}

impl<'a> UpstreamChatRequest<'a> {
    /// Streaming request for the given model and history
    pub fn streaming(model: &'a str, messages: &'a [Message]) -> Self {
        Self {
            stream: true,
            model,
            messages,
        }
    }
}
