//! LLM provider factory.
//!
//! Builds the process-wide generation client from configuration.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use docqa_core::config::LlmSettings;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client for the configured provider.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or the HTTP client
/// cannot be built.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    match settings.provider.to_lowercase().as_str() {
        "ollama" => {
            let client = OllamaClient::with_base_url(
                &settings.endpoint,
                Duration::from_secs(settings.timeout_secs),
            )?;
            tracing::debug!(endpoint = %settings.endpoint, "Created Ollama client");
            Ok(Arc::new(client))
        }
        other => Err(AppError::Config(format!(
            "Unknown LLM provider: {}",
            other
        ))),
    }
}
