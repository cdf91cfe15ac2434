//! Ollama-backed language model built on Rig

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::ollama;
use tracing::debug;

use super::LanguageModel;
use crate::config::Config;
use crate::error::FactCheckError;

/// Local model served by Ollama
pub struct OllamaModel {
    client: ollama::Client,
    model: String,
    temperature: f64,
}

impl OllamaModel {
    /// Connect to the Ollama host named in the configuration.
    ///
    /// Rig's Ollama client reads `OLLAMA_API_BASE_URL`, so the configured
    /// host is exported before the client is built.
    pub fn from_config(config: &Config) -> Self {
        std::env::set_var("OLLAMA_API_BASE_URL", &config.ollama_host);
        let client = ollama::Client::from_env();

        debug!(
            host = %config.ollama_host,
            model = %config.model,
            "Connected to Ollama"
        );

        Self {
            client,
            model: config.model.clone(),
            temperature: f64::from(config.temperature),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String, FactCheckError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(preamble)
            .temperature(self.temperature)
            .build();

        agent
            .prompt(prompt.to_string())
            .await
            .map_err(|e| FactCheckError::capability("ollama", e.to_string()))
    }

    fn name(&self) -> &str {
        &self.model
    }
}
