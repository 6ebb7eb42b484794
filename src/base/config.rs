//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;
use tracing::warn;

use crate::base::prompts;

use super::types::Res;

/// Text-generation backend used by the reply generator.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI (or any OpenAI-compatible) chat completions.
    #[default]
    OpenAi,
    /// Google Gemini `generateContent`.
    Gemini,
}

/// Configuration for the messenger-relay application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConfigInner {
    /// Secret compared against `hub.verify_token` (`VERIFY_TOKEN`).
    pub verify_token: String,
    /// Page access token for the Graph API send endpoint (`PAGE_ACCESS_TOKEN`).
    pub page_access_token: String,
    /// Which text-generation backend to call (`LLM_PROVIDER`).
    pub llm_provider: LlmProvider,
    /// OpenAI API key (`OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// OpenAI model to use (`OPENAI_MODEL`).
    pub openai_model: String,
    /// Optional base URL for an OpenAI-compatible endpoint (`OPENAI_API_BASE`).
    pub openai_api_base: Option<String>,
    /// Gemini API key (`GEMINI_API_KEY`).
    pub gemini_api_key: String,
    /// Gemini model to use (`GEMINI_MODEL`).
    pub gemini_model: String,
    /// Gemini API base URL (`GEMINI_API_BASE_URL`).
    pub gemini_api_base_url: String,
    /// Sampling temperature (`TEMPERATURE`).
    /// Value between 0 and 2. Lower values keep answers close to the knowledge document.
    pub temperature: f32,
    /// Persona directive placed ahead of the knowledge document (`SYSTEM_DIRECTIVE`).
    pub system_directive: String,
    /// Reply sent when generation fails for any reason (`FALLBACK_MESSAGE`).
    pub fallback_message: String,
    /// Path of the knowledge document, read on every request (`KNOWLEDGE_PATH`).
    pub knowledge_path: std::path::PathBuf,
    /// Graph API base URL (`GRAPH_API_BASE_URL`).
    pub graph_api_base_url: String,
    /// Graph API version segment, e.g. `v19.0` (`GRAPH_API_VERSION`).
    pub graph_api_version: String,
    /// Listen address (`HOST`).
    pub host: String,
    /// Listen port (`PORT`, or `MESSENGER_RELAY_PORT`).
    pub port: u16,
    /// Timeout applied to every outbound HTTP call (`REQUEST_TIMEOUT_SECS`).
    pub request_timeout_secs: u64,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            verify_token: String::new(),
            page_access_token: String::new(),
            llm_provider: LlmProvider::default(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_base: None,
            gemini_api_key: String::new(),
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.3,
            system_directive: prompts::SYSTEM_DIRECTIVE.to_string(),
            fallback_message: prompts::FALLBACK_MESSAGE.to_string(),
            knowledge_path: "data.txt".into(),
            graph_api_base_url: "https://graph.facebook.com".to_string(),
            graph_api_version: "v19.0".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder();

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        // Hosting platforms hand out the port as a bare `PORT`.
        let cfg = cfg
            .add_source(config::Environment::default().prefix("MESSENGER_RELAY"))
            .set_override_option("port", std::env::var("PORT").ok())?;

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;
        result.warn_missing_secrets();

        Ok(result)
    }

    /// Rejects values that would make every request misbehave.
    pub fn validate(&self) -> Res<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow::anyhow!("Temperature must be between 0 and 2."));
        }

        if self.request_timeout_secs < 1 {
            return Err(anyhow::anyhow!("Request timeout must be at least one second."));
        }

        Ok(())
    }

    /// Missing secrets are not fatal: the affected calls degrade at first use.
    fn warn_missing_secrets(&self) {
        if self.verify_token.is_empty() {
            warn!("No verify token configured; webhook verification will always be rejected.");
        }

        if self.page_access_token.is_empty() {
            warn!("No page access token configured; replies will not be delivered.");
        }

        let llm_key_missing = match self.llm_provider {
            LlmProvider::OpenAi => self.openai_api_key.is_empty(),
            LlmProvider::Gemini => self.gemini_api_key.is_empty(),
        };

        if llm_key_missing {
            warn!("No API key configured for {:?}; every reply will be the fallback message.", self.llm_provider);
        }
    }

    /// Timeout for outbound HTTP calls.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
