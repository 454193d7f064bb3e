use crate::{error::ModelFailure, AnalysisError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";

const SYSTEM_PROMPT: &str = "You are a competitive intelligence analyst. You read public website content and produce concise, evidence-based analysis in the exact section structure requested.";

/// A language-model endpoint that turns one prompt into one completion.
/// Implementations make a single request per call and never retry.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ModelFailure>;

    fn name(&self) -> &str;
}

/// Provider credential. Supplied by the caller, never persisted or logged.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 1500,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: ApiKey,
    settings: ModelSettings,
}

impl OpenAiClient {
    pub fn new(api_key: ApiKey, settings: ModelSettings) -> Result<Self, AnalysisError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(settings.timeout)
                .build()?,
            api_key,
            settings,
        })
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn headers(&self) -> Result<HeaderMap, ModelFailure> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose().trim()))
            .map_err(|_| ModelFailure::AuthError)?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

fn transport_failure(err: reqwest::Error) -> ModelFailure {
    if err.is_timeout() {
        ModelFailure::Timeout
    } else {
        ModelFailure::ProviderError(err.to_string())
    }
}

fn status_failure(status: StatusCode, body: &str) -> ModelFailure {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ModelFailure::AuthError,
        StatusCode::TOO_MANY_REQUESTS => ModelFailure::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ModelFailure::Timeout,
        _ => {
            let snippet: String = body.chars().take(200).collect();
            ModelFailure::ProviderError(format!("{}: {}", status, snippet.trim()))
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ModelFailure> {
        let payload = ChatRequest {
            model: &self.settings.model,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.settings.endpoint)
            .headers(self.headers()?)
            .json(&payload)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_failure)?;
        if !status.is_success() {
            return Err(status_failure(status, &body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ModelFailure::ProviderError(format!("unreadable completion: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelFailure::EmptyResponse);
        }

        debug!(model = %self.settings.model, chars = text.len(), "completion received");
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.settings.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
