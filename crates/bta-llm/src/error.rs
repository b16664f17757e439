//! LLM error types.

use thiserror::Error;

/// Errors that can occur while talking to the completion API.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("No API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}
