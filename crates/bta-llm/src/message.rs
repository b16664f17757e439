//! Chat message types and the model abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmResult;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Anything that can turn a conversation into a completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run a completion and return the assistant text.
    ///
    /// Implementations must return [`crate::LlmError::EmptyResponse`] rather
    /// than an empty string.
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> LlmResult<String>;

    /// Model identifier, for logging and history records.
    fn model_name(&self) -> &str;
}
