//! # BTA LLM
//!
//! Chat completion client for OpenAI-compatible APIs (OpenAI, Groq, Ollama's
//! `/v1` endpoint, vLLM, ...).
//!
//! Callers depend on the [`ChatModel`] trait so the HTTP client can be swapped
//! for a stub in tests.

pub mod client;
pub mod error;
pub mod message;

pub use client::{OpenAiClient, OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{LlmError, LlmResult};
pub use message::{ChatMessage, ChatModel, Role};
