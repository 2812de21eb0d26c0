//! Document ingestion and question answering for docqa.
//!
//! Uploads are extracted, chunked, embedded and written to a per-document
//! SQLite vector index. Queries retrieve the closest chunks and answer them
//! with one LLM call. CSV uploads skip the index and are answered by a
//! [`tabular::TableAgent`] over the whole table.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod parser;
pub mod rag;
pub mod retriever;
pub mod service;
pub mod store;
pub mod tabular;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingProvider};
pub use service::KnowledgeService;
pub use tabular::{LlmTableAgent, Table, TableAgent};
pub use types::{
    Answer, Chunk, CsvUpload, DocumentId, DocumentType, PdfUpload, Query, RetrievedChunk,
    SourceRef, UPLOAD_STATUS,
};
