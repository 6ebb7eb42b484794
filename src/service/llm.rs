//! Text-generation clients: OpenAI via async-openai, Gemini over plain HTTP.

use std::{ops::Deref, sync::Arc, time::Duration};

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::base::{
    config::{Config, LlmProvider},
    types::{GenerationError, Res},
};

// Traits.

/// Generic LLM client trait that clients must implement.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenericLlmClient {
    /// Complete a single turn from a system prompt and the user's message.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, GenerationError>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient + Send + Sync + 'static>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    /// Wrap an arbitrary implementation (used for fakes in tests).
    pub fn new(inner: Arc<dyn GenericLlmClient + Send + Sync + 'static>) -> Self {
        Self { inner }
    }

    /// Build the client selected by `llm_provider`.
    pub fn from_config(config: &Config) -> Res<Self> {
        match config.llm_provider {
            LlmProvider::OpenAi => Self::openai(config),
            LlmProvider::Gemini => Self::gemini(config),
        }
    }

    pub fn openai(config: &Config) -> Res<Self> {
        let client = OpenAiLlmClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }

    pub fn gemini(config: &Config) -> Res<Self> {
        let client = GeminiLlmClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    has_api_key: bool,
    model: String,
    temperature: f32,
}

impl OpenAiLlmClient {
    pub fn new(config: &Config) -> Res<Self> {
        let mut cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        if let Some(base) = &config.openai_api_base {
            cfg = cfg.with_api_base(base.clone());
        }

        let http = reqwest::Client::builder().timeout(config.request_timeout()).build()?;

        // One attempt only: async-openai otherwise retries rate limits for minutes.
        let single_attempt = backoff::ExponentialBackoffBuilder::new().with_max_elapsed_time(Some(Duration::ZERO)).build();

        Ok(Self {
            client: Client::with_config(cfg).with_http_client(http).with_backoff(single_attempt),
            has_api_key: !config.openai_api_key.is_empty(),
            model: config.openai_model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, GenerationError> {
        if !self.has_api_key {
            return Err(GenerationError::MissingCredentials("openai"));
        }

        debug!("Requesting chat completion");

        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(system_prompt.to_string()),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(user_message.to_string()),
                name: None,
            }),
        ];

        let request = CreateChatCompletionRequestArgs::default().model(&self.model).messages(messages).temperature(self.temperature).build()?;

        let response = self.client.chat().create(request).await?;

        response.choices.into_iter().next().and_then(|choice| choice.message.content).ok_or(GenerationError::EmptyResponse)
    }
}

/// Gemini `generateContent` client implementation.
#[derive(Clone)]
pub struct GeminiLlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();

        if text.is_empty() { None } else { Some(text) }
    }
}

impl GeminiLlmClient {
    pub fn new(config: &Config) -> Res<Self> {
        let http = reqwest::Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            http,
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_api_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn request(&self, system_prompt: &str, user_message: &str) -> GeminiRequest {
        GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: system_prompt.to_string() }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: user_message.to_string() }],
            }],
            generation_config: GeminiGenerationConfig { temperature: self.temperature },
        }
    }
}

#[async_trait]
impl GenericLlmClient for GeminiLlmClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::MissingCredentials("gemini"));
        }

        debug!("Requesting Gemini completion");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request(system_prompt, user_message))
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status: status.as_u16(), body });
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        parsed.text().ok_or(GenerationError::EmptyResponse)
    }
}
