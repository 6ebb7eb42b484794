//! Knowledge document loader.
//!
//! The document is a flat text file read in full on every request, so edits
//! show up without a restart.

use std::path::{Path, PathBuf};

use tracing::{instrument, warn};

use crate::base::{config::Config, prompts::MISSING_KNOWLEDGE, types::Res};

/// Read-through source for the knowledge document.
#[derive(Clone, Debug)]
pub struct KnowledgeSource {
    path: PathBuf,
}

impl KnowledgeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.knowledge_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, failing if the file is unavailable.
    pub async fn try_load(&self) -> Res<String> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(text)
    }

    /// Read the document, substituting a placeholder if it cannot be read.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> String {
        match self.try_load().await {
            Ok(text) => text,
            Err(err) => {
                warn!("Knowledge document unavailable: {}", err);
                MISSING_KNOWLEDGE.to_string()
            }
        }
    }
}
