//! Vector index abstraction.
//!
//! An [`IndexStore`] maps document identifiers to per-document indices, so
//! the storage backend can change without touching retrieval. A
//! [`VectorIndex`] is the read-only handle to one document's index.

use crate::types::{DocumentId, IndexEntry, IndexManifest, RetrievedChunk};
use docqa_core::{AppError, AppResult};
use std::cmp::Ordering;

/// Key-value store of per-document indices.
///
/// Indices are written once and never updated. `create` must make the index
/// durable and visible atomically: either the whole index exists afterwards
/// or nothing does.
pub trait IndexStore: Send + Sync {
    /// Persist a new index. Fails if one already exists for the identifier.
    fn create(&self, manifest: &IndexManifest, entries: &[IndexEntry]) -> AppResult<()>;

    /// Open an existing index. Fails with `NotFound` if absent.
    fn open(&self, document_id: &DocumentId) -> AppResult<Box<dyn VectorIndex>>;

    /// Whether a committed index exists for the identifier.
    fn exists(&self, document_id: &DocumentId) -> bool;
}

/// Read-only handle to one document's index.
pub trait VectorIndex: Send {
    fn manifest(&self) -> &IndexManifest;

    /// Number of stored chunks.
    fn len(&self) -> AppResult<usize>;

    fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Return at most `top_k` chunks scoring at least `min_score`, best first.
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> AppResult<Vec<RetrievedChunk>>;
}

/// Map a failed blocking storage task to a storage error.
pub(crate) fn join_error(e: tokio::task::JoinError) -> AppError {
    AppError::Storage(format!("Task join error: {}", e))
}

/// Cosine similarity. Mismatched lengths or zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Filter by `min_score`, order by descending score then ascending chunk
/// position, and keep the first `top_k`.
pub fn rank(mut scored: Vec<RetrievedChunk>, top_k: usize, min_score: f32) -> Vec<RetrievedChunk> {
    scored.retain(|r| r.score >= min_score && !r.score.is_nan());
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.position.cmp(&b.chunk.position))
    });
    scored.truncate(top_k);
    scored
}
