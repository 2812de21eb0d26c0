//! Embedding provider trait and factory.

use crate::types::EmbeddingFingerprint;
use docqa_core::config::EmbeddingSettings;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Providers are process-wide singletons and must be safe to call
/// concurrently.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g., "ollama", "fastembed", "trigram")
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model_name(&self) -> &str;

    /// Length of every vector this provider returns
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::ServiceUnavailable("No embedding returned".to_string()))
    }

    /// Identity recorded in every index built with this provider.
    fn fingerprint(&self) -> EmbeddingFingerprint {
        EmbeddingFingerprint {
            provider: self.provider_name().to_string(),
            model: self.model_name().to_string(),
            dimensions: self.dimensions(),
        }
    }
}

/// Create the configured embedding provider.
///
/// `endpoint` is the resolved Ollama base URL, used only by the ollama provider.
pub fn create_provider(
    settings: &EmbeddingSettings,
    endpoint: &str,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "trigram" => Ok(Arc::new(super::providers::trigram::TrigramProvider::new(
            settings.dimensions,
        ))),

        "ollama" => Ok(Arc::new(super::providers::ollama::OllamaProvider::new(
            settings, endpoint,
        )?)),

        #[cfg(feature = "fastembed")]
        "fastembed" => Ok(Arc::new(
            super::providers::fastembed::FastEmbedProvider::new(settings)?,
        )),

        #[cfg(not(feature = "fastembed"))]
        "fastembed" => Err(AppError::Config(
            "The fastembed provider requires building with --features fastembed".to_string(),
        )),

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, fastembed, trigram",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: provider.to_string(),
            dimensions: 384,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_trigram_provider() {
        let provider = create_provider(&settings("trigram"), "http://localhost:11434").unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(
            provider.fingerprint(),
            EmbeddingFingerprint {
                provider: "trigram".to_string(),
                model: "trigram-v1".to_string(),
                dimensions: 384,
            }
        );
    }

    #[test]
    fn test_create_ollama_provider_is_lazy() {
        let provider = create_provider(&settings("ollama"), "http://127.0.0.1:9").unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_provider(&settings("word2vec"), "http://localhost:11434");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&settings("trigram"), "").unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
