//! Reply generator: knowledge document + persona + user text in, reply text out.

use tracing::{debug, instrument, warn};

use crate::base::{config::Config, prompts::build_system_prompt, types::GenerationError};

use super::{knowledge::KnowledgeSource, llm::LlmClient};

/// Produces replies grounded in the knowledge document.
///
/// This is trivially cloneable and can be shared across request handlers.
#[derive(Clone)]
pub struct ReplyGenerator {
    llm: LlmClient,
    knowledge: KnowledgeSource,
    directive: String,
    fallback: String,
}

impl ReplyGenerator {
    pub fn new(config: &Config, llm: LlmClient) -> Self {
        Self {
            llm,
            knowledge: KnowledgeSource::from_config(config),
            directive: config.system_directive.clone(),
            fallback: config.fallback_message.clone(),
        }
    }

    /// The text sent when generation fails.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Generate a reply, surfacing why it failed.
    #[instrument(skip_all)]
    pub async fn try_generate(&self, user_text: &str) -> Result<String, GenerationError> {
        let knowledge = self.knowledge.load().await;
        let system_prompt = build_system_prompt(&self.directive, &knowledge);

        debug!("Generating reply for: {}", user_text);

        let reply = self.llm.complete(&system_prompt, user_text).await?;
        let reply = reply.trim();

        if reply.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(reply.to_string())
    }

    /// Generate a reply; never fails, returning the fallback message instead.
    #[instrument(skip_all)]
    pub async fn generate(&self, user_text: &str) -> String {
        match self.try_generate(user_text).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(kind = err.kind(), "Reply generation failed, using fallback: {}", err);
                self.fallback.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, sync::Arc};

    use super::*;
    use crate::{
        base::{config::ConfigInner, prompts::FALLBACK_MESSAGE},
        service::llm::MockGenericLlmClient,
    };

    fn generator(mock: MockGenericLlmClient, knowledge_path: std::path::PathBuf) -> ReplyGenerator {
        let config = Config::from(ConfigInner { knowledge_path, ..Default::default() });
        ReplyGenerator::new(&config, LlmClient::new(Arc::new(mock)))
    }

    #[tokio::test]
    async fn prompt_carries_knowledge_and_verbatim_user_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Delivery takes two days.").unwrap();

        let mut mock = MockGenericLlmClient::new();
        mock.expect_complete()
            .withf(|system, user| system.contains("customer service agent") && system.contains("Delivery takes two days.") && user == "  كم يوم التوصيل؟ ")
            .times(1)
            .returning(|_, _| Ok("  Two days.\n".to_string()));

        let reply = generator(mock, file.path().to_path_buf()).generate("  كم يوم التوصيل؟ ").await;

        assert_eq!(reply, "Two days.");
    }

    #[tokio::test]
    async fn failure_returns_exact_fallback() {
        let mut mock = MockGenericLlmClient::new();
        mock.expect_complete().returning(|_, _| Err(GenerationError::Request("connection reset".to_string())));

        let reply = generator(mock, "missing.txt".into()).generate("hello").await;

        assert_eq!(reply, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn missing_credentials_is_distinguishable() {
        let mut mock = MockGenericLlmClient::new();
        mock.expect_complete().returning(|_, _| Err(GenerationError::MissingCredentials("openai")));

        let generator = generator(mock, "missing.txt".into());

        let err = generator.try_generate("hello").await.unwrap_err();
        assert_eq!(err.kind(), "missing_credentials");
        assert_eq!(generator.generate("hello").await, generator.fallback());
    }

    #[tokio::test]
    async fn blank_completion_falls_back() {
        let mut mock = MockGenericLlmClient::new();
        mock.expect_complete().returning(|_, _| Ok(" \n ".to_string()));

        let generator = generator(mock, "missing.txt".into());

        assert!(matches!(generator.try_generate("hello").await, Err(GenerationError::EmptyResponse)));
        assert_eq!(generator.generate("hello").await, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn missing_knowledge_still_generates() {
        let mut mock = MockGenericLlmClient::new();
        mock.expect_complete().withf(|system, _| system.contains("No information available")).returning(|_, _| Ok("Please call us.".to_string()));

        let reply = generator(mock, "does/not/exist.txt".into()).generate("hours?").await;

        assert_eq!(reply, "Please call us.");
    }
}
