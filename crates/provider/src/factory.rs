//! Backend selection

use std::sync::Arc;
use tracing::info;

use logpilot_config::{Config, LlmProvider};

use crate::{GeminiProvider, OpenAiCompatProvider, Provider, ProviderError, Result};

/// Build the backend named by `config.agent.provider`
pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match config.agent.provider {
        LlmProvider::Gemini => {
            let gemini = &config.providers.gemini;
            if gemini.api_key.is_empty() {
                return Err(ProviderError::NoApiKey);
            }
            Arc::new(GeminiProvider::new(
                gemini.api_key.clone(),
                gemini.api_base.clone(),
                Some(gemini.model.clone()),
            ))
        }
        LlmProvider::Github => {
            let github = &config.providers.github;
            if github.token.is_empty() {
                return Err(ProviderError::NoApiKey);
            }
            Arc::new(OpenAiCompatProvider::new(
                github.token.clone(),
                Some(github.endpoint.clone()),
                Some(github.model.clone()),
            ))
        }
    };

    info!(
        "Using {} backend with model {}",
        provider.name(),
        provider.default_model()
    );
    Ok(provider)
}
