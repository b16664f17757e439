//! OpenAI-compatible HTTP client.
//!
//! Posts to `{base_url}/chat/completions`. Requests are optionally paced to
//! `max_rpm` per minute, and HTTP 429 responses are retried with exponential
//! backoff (honouring `Retry-After` when the server sends one).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{LlmError, LlmResult};
use crate::message::{ChatMessage, ChatModel};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Requests per minute; 0 disables pacing.
    pub max_rpm: u32,
    /// Retries on HTTP 429.
    pub max_retries: u32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_rpm: 0,
            max_retries: 3,
            max_tokens: None,
            timeout: Duration::from_secs(300),
        }
    }
}

impl OpenAiConfig {
    /// Minimum gap between two requests implied by `max_rpm`.
    pub fn min_interval(&self) -> Option<Duration> {
        if self.max_rpm == 0 {
            None
        } else {
            Some(Duration::from_secs(60) / self.max_rpm)
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completion client.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
    last_request: Mutex<Option<Instant>>,
}

impl OpenAiClient {
    /// Create a client from configuration.
    pub fn new(mut config: OpenAiConfig) -> LlmResult<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        info!(base_url = %config.base_url, model = %config.model, "LLM client configured");

        Ok(Self {
            config,
            client,
            last_request: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Wait until the next request is allowed under `max_rpm`.
    async fn pace(&self) {
        let Some(interval) = self.config.min_interval() else {
            return;
        };
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < interval {
                let wait = interval - elapsed;
                debug!(?wait, "Pacing LLM request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// The key to send, if any. Only the hosted OpenAI API insists on one;
    /// local servers such as Ollama accept anonymous requests.
    fn api_key(&self) -> LlmResult<Option<&str>> {
        let key = self.config.api_key.as_deref().filter(|k| !k.is_empty());
        if key.is_none() && self.config.base_url == DEFAULT_BASE_URL {
            return Err(LlmError::MissingApiKey);
        }
        Ok(key)
    }

    async fn send_once(
        &self,
        body: &CompletionRequest<'_>,
        api_key: Option<&str>,
    ) -> LlmResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let mut req = self.client.post(&url).json(body);
        if let Some(key) = api_key {
            req = req.bearer_auth(key);
        }
        Ok(req.send().await?)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> LlmResult<String> {
        let api_key = self.api_key()?;

        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut attempt = 0;
        loop {
            self.pace().await;
            let resp = self.send_once(&body, api_key).await?;
            let status = resp.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                && attempt < self.config.max_retries
            {
                let retry_after = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after);
                let delay = retry_after.unwrap_or_else(|| backoff_delay(attempt));
                warn!(attempt, ?delay, "Rate limited by LLM API, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(LlmError::Api { status: status.as_u16(), body });
            }

            let text = resp.text().await?;
            let content = extract_content(&text)?;
            debug!(chars = content.len(), model = %self.config.model, "Completion received");
            return Ok(content);
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Pull the first choice's content out of a completion response body.
fn extract_content(body: &str) -> LlmResult<String> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(content)
}

/// Parse a `Retry-After` header given in seconds.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| Duration::from_secs_f64(s).min(MAX_BACKOFF))
}

/// Exponential backoff: 1s, 2s, 4s, ... capped at 30s.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_secs(secs).min(MAX_BACKOFF)
}
