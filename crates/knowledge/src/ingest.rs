//! Embed chunks and persist them as a new per-document index.

use crate::embeddings::EmbeddingProvider;
use crate::types::{Chunk, DocumentId, DocumentInfo, IndexEntry, IndexManifest};
use crate::vector_index::{join_error, IndexStore};
use chrono::Utc;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Instant;

pub struct Ingestor {
    index_store: Arc<dyn IndexStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        index_store: Arc<dyn IndexStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> Self {
        Self {
            index_store,
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed `chunks` and create the index for `document_id`.
    ///
    /// The index is visible only once fully written. Zero chunks produce an
    /// empty but valid index.
    pub async fn ingest(
        &self,
        document_id: &DocumentId,
        document: &DocumentInfo,
        chunks: &[Chunk],
    ) -> AppResult<IndexManifest> {
        let start = Instant::now();
        let dimensions = self.embedder.dimensions();

        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(AppError::Storage(format!(
                    "Embedder returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                if embedding.len() != dimensions {
                    return Err(AppError::Storage(format!(
                        "Embedding for chunk {} has {} dimensions, expected {}",
                        chunk.position,
                        embedding.len(),
                        dimensions
                    )));
                }
                entries.push(IndexEntry {
                    chunk: chunk.clone(),
                    embedding,
                });
            }
        }

        let manifest = IndexManifest {
            document_id: *document_id,
            document: document.clone(),
            embedding: self.embedder.fingerprint(),
            chunk_count: entries.len(),
            created_at: Utc::now(),
        };

        let store = self.index_store.clone();
        let committed = manifest.clone();
        tokio::task::spawn_blocking(move || store.create(&committed, &entries))
            .await
            .map_err(join_error)??;

        tracing::info!(
            "Indexed {} chunks for {} in {:.2}s",
            manifest.chunk_count,
            document_id,
            start.elapsed().as_secs_f64()
        );

        Ok(manifest)
    }
}
