//! Similarity search over one document's index.

use crate::embeddings::EmbeddingProvider;
use crate::types::{DocumentId, RetrievedChunk};
use crate::vector_index::{join_error, IndexStore, VectorIndex};
use docqa_core::config::RetrievalSettings;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;

pub struct Retriever {
    index_store: Arc<dyn IndexStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    pub fn new(
        index_store: Arc<dyn IndexStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: &RetrievalSettings,
    ) -> Self {
        Self {
            index_store,
            embedder,
            top_k: settings.top_k,
            min_score: settings.score_threshold,
        }
    }

    /// Return at most `top_k` chunks scoring at least the threshold, best
    /// first, ties broken by chunk position.
    ///
    /// Fails with `NotFound` when the document has no index, and with
    /// `Storage` when the index was built by a different embedder.
    #[tracing::instrument(skip(self, query), fields(document_id = %document_id))]
    pub async fn retrieve(
        &self,
        document_id: &DocumentId,
        query: &str,
    ) -> AppResult<Vec<RetrievedChunk>> {
        // SQLite open and the full scan are blocking; keep them off the runtime.
        let store = self.index_store.clone();
        let id = *document_id;
        let expected = self.embedder.fingerprint();
        let index = tokio::task::spawn_blocking(move || -> AppResult<Option<Box<dyn VectorIndex>>> {
            let index = store.open(&id)?;

            let actual = &index.manifest().embedding;
            if *actual != expected {
                return Err(AppError::Storage(format!(
                    "Index for {} was built with {}, but the running embedder is {}",
                    id, actual, expected
                )));
            }

            if index.is_empty()? {
                return Ok(None);
            }
            Ok(Some(index))
        })
        .await
        .map_err(join_error)??;

        let Some(index) = index else {
            tracing::debug!("Index is empty, nothing to retrieve");
            return Ok(Vec::new());
        };

        let query_embedding = self.embedder.embed(query).await?;
        let (top_k, min_score) = (self.top_k, self.min_score);
        let results = tokio::task::spawn_blocking(move || {
            index.search(&query_embedding, top_k, min_score)
        })
        .await
        .map_err(join_error)??;

        match (results.first(), results.last()) {
            (Some(top), Some(lowest)) => tracing::info!(
                "Retrieved {} relevant chunks (top score: {:.3}, lowest: {:.3})",
                results.len(),
                top.score,
                lowest.score
            ),
            _ => tracing::info!(
                "No relevant chunks found (all scores below {:.2} threshold)",
                self.min_score
            ),
        }

        Ok(results)
    }
}
