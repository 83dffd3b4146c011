//! Answering Service Provider
//!
//! The dispatcher talks to the remote answering service only through
//! [`AnsweringService`]. [`SonarClient`] is the HTTP implementation: an
//! OpenAI-compatible chat completion endpoint asked for a JSON answer that
//! matches the request's schema.

use crate::error::AnswerError;
use crate::types::{AnswerRequest, RawAnswer};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote answering service
#[async_trait]
pub trait AnsweringService: Send + Sync {
    /// Ask one question. Errors are classified so the retry policy can act on them.
    async fn answer(&self, request: &AnswerRequest) -> Result<RawAnswer, AnswerError>;
}

/// Provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Chat completions endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_endpoint() -> String {
    "https://api.perplexity.ai/chat/completions".to_string()
}

fn default_model() -> String {
    "sonar".to_string()
}

fn default_api_key_env() -> String {
    "PERPLEXITY_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            temperature: None,
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(format!("Endpoint must be an http(s) URL: {}", self.endpoint));
        }
        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

const SYSTEM_PROMPT: &str =
    "Answer precisely and concisely. Respond only with JSON matching the requested schema.";

/// Map a transport error to an answer error kind
fn map_http_error(error: reqwest::Error) -> AnswerError {
    if error.is_timeout() {
        AnswerError::Timeout(error.to_string())
    } else if let Some(status) = error.status() {
        map_status(status.as_u16(), error.to_string())
    } else if error.is_builder() {
        AnswerError::Malformed(error.to_string())
    } else {
        AnswerError::ServiceError(format!("HTTP error: {}", error))
    }
}

fn map_status(status: u16, message: String) -> AnswerError {
    match status {
        408 => AnswerError::Timeout(message),
        429 => AnswerError::RateLimited(message),
        400..=499 => AnswerError::Malformed(format!("status {}: {}", status, message)),
        _ => AnswerError::ServiceError(format!("status {}: {}", status, message)),
    }
}

/// Sonar-style chat completion client
pub struct SonarClient {
    client: Client,
    config: ProviderConfig,
    api_key: String,
}

impl SonarClient {
    pub fn new(config: ProviderConfig, api_key: String) -> Result<Self, AnswerError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AnswerError::ServiceError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Build a client reading the token from the configured environment variable.
    pub fn from_env(config: ProviderConfig) -> Result<Self, AnswerError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            AnswerError::Malformed(format!(
                "Environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        Self::new(config, api_key)
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl AnsweringService for SonarClient {
    async fn answer(&self, request: &AnswerRequest) -> Result<RawAnswer, AnswerError> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: &request.schema_name,
                    schema: &request.schema,
                },
            },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status(status.as_u16(), error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AnswerError::ServiceError(format!("Failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AnswerError::ServiceError("No choices in response".to_string()))?;

        Ok(RawAnswer {
            body: choice.message.content,
            citations: completion.citations,
        })
    }
}
