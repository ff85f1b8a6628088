//! HTTP client for an OpenAI-compatible chat completions API.
//!
//! Every call asks for a JSON object response and returns the first
//! choice's content already parsed. Transient failures are retried, see
//! [`crate::retry`].

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;
use skuopt_core::AppConfig;

use crate::error::LlmError;
use crate::retry::retry_with_backoff;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Client for the chat completions endpoint.
///
/// Use [`ChatClient::new`] for production or [`ChatClient::with_base_url`]
/// to point at a mock server in tests.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint.as_str())
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Creates a client pointed at the public `OpenAI` API.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`LlmError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("skuopt/0.1")
            .build()?;

        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint).map_err(|e| LlmError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            endpoint,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    /// Builds a client from the model settings in [`AppConfig`].
    ///
    /// # Errors
    ///
    /// Same as [`ChatClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, LlmError> {
        Ok(Self::with_base_url(
            &config.openai_api_key,
            &config.openai_model,
            config.openai_timeout_secs,
            &config.openai_base_url,
        )?
        .with_retry(
            config.openai_max_retries,
            config.openai_retry_backoff_base_ms,
        ))
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `messages` and returns the completion parsed as a JSON value.
    ///
    /// # Errors
    ///
    /// - [`LlmError::Http`] on network failure.
    /// - [`LlmError::Api`] when the provider answers with a non-2xx status.
    /// - [`LlmError::EmptyCompletion`] when no content comes back.
    /// - [`LlmError::Deserialize`] when the body or the content is not JSON.
    pub async fn complete_json(&self, messages: &[ChatMessage]) -> Result<Value, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format: ResponseFormat::JSON_OBJECT,
        };

        let content = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.send_once(&request)
        })
        .await?;

        serde_json::from_str(&content).map_err(|e| LlmError::Deserialize {
            context: "completion content".to_owned(),
            source: e,
        })
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Deserialize {
                context: "chat completion response".to_owned(),
                source: e,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

/// Pulls `error.message` out of a provider error body, falling back to the
/// raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| body.trim().to_owned())
}
