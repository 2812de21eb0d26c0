//! Local ONNX embeddings via fastembed.
//!
//! The model is downloaded and loaded on first use, then kept for the life
//! of the process. Inference runs on the blocking thread pool.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use docqa_core::config::EmbeddingSettings;
use docqa_core::{AppError, AppResult};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::fmt;
use std::sync::{Arc, Mutex};

pub struct FastEmbedProvider {
    model_name: String,
    model: EmbeddingModel,
    dimensions: usize,
    batch_size: usize,
    loaded: Arc<Mutex<Option<TextEmbedding>>>,
}

/// Map a configured model name to its fastembed model and vector length.
fn resolve_model(name: &str) -> AppResult<(EmbeddingModel, usize)> {
    match name {
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        "bge-large-en-v1.5" => Ok((EmbeddingModel::BGELargeENV15, 1024)),
        "nomic-embed-text-v1" => Ok((EmbeddingModel::NomicEmbedTextV1, 768)),
        "nomic-embed-text-v1.5" => Ok((EmbeddingModel::NomicEmbedTextV15, 768)),
        "multilingual-e5-small" => Ok((EmbeddingModel::MultilingualE5Small, 384)),
        "multilingual-e5-base" => Ok((EmbeddingModel::MultilingualE5Base, 768)),
        other => Err(AppError::Config(format!(
            "Unknown fastembed model: '{}'. Supported: all-minilm-l6-v2, bge-small-en-v1.5, \
             bge-base-en-v1.5, bge-large-en-v1.5, nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base",
            other
        ))),
    }
}

impl FastEmbedProvider {
    pub fn new(settings: &EmbeddingSettings) -> AppResult<Self> {
        let (model, dimensions) = resolve_model(&settings.model)?;
        if settings.dimensions != dimensions {
            tracing::warn!(
                "Configured dimensions {} ignored; fastembed model '{}' produces {}",
                settings.dimensions,
                settings.model,
                dimensions
            );
        }

        Ok(Self {
            model_name: settings.model.clone(),
            model,
            dimensions,
            batch_size: settings.batch_size.max(1),
            loaded: Arc::new(Mutex::new(None)),
        })
    }
}

impl fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model_name)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn provider_name(&self) -> &str {
        "fastembed"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let loaded = Arc::clone(&self.loaded);
        let model = self.model.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = loaded
                .lock()
                .map_err(|_| AppError::Other("Embedding model lock poisoned".to_string()))?;

            if guard.is_none() {
                tracing::info!("Loading local embedding model {:?}", model);
                let embedding = TextEmbedding::try_new(
                    InitOptions::new(model).with_show_download_progress(false),
                )
                .map_err(|e| {
                    AppError::ServiceUnavailable(format!(
                        "Failed to initialize local embedding model: {}",
                        e
                    ))
                })?;
                *guard = Some(embedding);
            }

            let embedding = guard.as_mut().ok_or_else(|| {
                AppError::ServiceUnavailable("Local embedding model not loaded".to_string())
            })?;

            embedding
                .embed(texts, Some(batch_size))
                .map_err(|e| AppError::ServiceUnavailable(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| AppError::Other(format!("Embedding task failed: {}", e)))?
    }
}
