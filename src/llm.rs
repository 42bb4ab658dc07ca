//! Text-generation client for relevancy scoring.
//!
//! Talks to OpenAI-compatible chat-completion endpoints. Which endpoint and
//! model are used is decided by an explicit [`InferenceProvider`].

use crate::error::{DigestError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Credentials of this length or shorter were historically SambaNova keys.
const LEGACY_SHORT_KEY_LEN: usize = 37;

/// Default request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Hosted inference backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceProvider {
    SambaNova,
    OpenAi,
}

impl InferenceProvider {
    pub fn base_url(self) -> &'static str {
        match self {
            Self::SambaNova => "https://api.sambanova.ai/v1",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::SambaNova => "Meta-Llama-3.1-405B-Instruct",
            Self::OpenAi => "gpt-3.5-turbo-16k",
        }
    }

    /// Guess a provider from the shape of a credential.
    ///
    /// Only reachable through [`ProviderChoice::Auto`]; key length is not a
    /// contract any provider makes.
    pub fn guess_from_credential(api_key: &str) -> Self {
        if api_key.len() <= LEGACY_SHORT_KEY_LEN {
            Self::SambaNova
        } else {
            Self::OpenAi
        }
    }
}

impl std::fmt::Display for InferenceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SambaNova => write!(f, "sambanova"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// How the provider is picked for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderChoice {
    Explicit(InferenceProvider),
    /// Infer from the credential (legacy behaviour)
    Auto,
}

impl ProviderChoice {
    pub fn resolve(self, api_key: &str) -> InferenceProvider {
        match self {
            Self::Explicit(provider) => provider,
            Self::Auto => InferenceProvider::guess_from_credential(api_key),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: InferenceProvider,
    pub api_key: String,
    /// Overrides the provider's default model
    pub model: Option<String>,
    /// Overrides the provider's base URL
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(provider: InferenceProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: None,
            base_url: None,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.base_url())
            .trim_end_matches('/')
    }
}

/// Sampling parameters for one completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

/// Anything that can turn a prompt into raw model text.
///
/// `Ok(None)` means the service gave no usable reply; callers treat that batch
/// as empty rather than failed.
pub trait CompletionClient {
    fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// OpenAI-compatible API request/response structures
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatRequestMessage<'a>; 1],
    temperature: f32,
    top_p: f32,
    n: u32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client over `reqwest`.
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DigestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: format!("{}/chat/completions", config.base_url()),
            api_key: config.api_key.clone(),
        })
    }
}

impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<Option<String>> {
        let body = ChatCompletionRequest {
            model: &params.model,
            messages: [ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            top_p: params.top_p,
            n: 1,
            max_tokens: params.max_tokens,
        };

        debug!(url = %self.api_url, model = %params.model, "Sending LLM request");

        let response = match self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(error = %e, "LLM request timed out, treating as empty reply");
                return Ok(None);
            }
            Err(e) => return Err(DigestError::Network(e)),
        };

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DigestError::Api {
                code: status.as_u16() as i32,
                message: format!("LLM API error: {} - {}", status, error_text),
            });
        }

        let api_response: ChatCompletionResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) if e.is_timeout() => {
                warn!(error = %e, "LLM response body timed out, treating as empty reply");
                return Ok(None);
            }
            Err(e) => {
                return Err(DigestError::Parse(format!(
                    "Failed to parse LLM response: {}",
                    e
                )))
            }
        };

        Ok(api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty()))
    }
}
