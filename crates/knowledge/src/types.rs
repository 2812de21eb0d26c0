//! Domain types shared across the knowledge pipeline.

use chrono::{DateTime, Utc};
use docqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Status string reported for every successful upload.
pub const UPLOAD_STATUS: &str = "Successfully Uploaded";

/// Kind of uploaded document. Chosen once at upload and required on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Csv,
}

impl DocumentType {
    /// File extension used for the stored raw upload.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Csv => "csv",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for DocumentType {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(DocumentType::Pdf),
            "csv" => Ok(DocumentType::Csv),
            other => Err(AppError::BadRequest(format!(
                "Unsupported document type: {}",
                other
            ))),
        }
    }
}

/// Server-issued document identifier (UUID v4).
///
/// Only the canonical hyphenated form ever reaches a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a client-supplied identifier.
    ///
    /// A string that is not a UUID can never have been issued, so it is
    /// reported as `NotFound` rather than `BadRequest`.
    pub fn parse(raw: &str) -> AppResult<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| AppError::NotFound(format!("No document with identifier '{}'", raw)))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A contiguous span of a document's extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Document the chunk was cut from
    pub document_id: DocumentId,

    /// 0-based position in document order
    pub position: usize,

    /// 1-based page the chunk came from
    pub page: u32,

    /// Original upload filename
    pub source: String,

    pub text: String,
}

/// A chunk returned by similarity search, with its cosine score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Identity of the embedding function an index was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingFingerprint {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl fmt::Display for EmbeddingFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({} dims)", self.provider, self.model, self.dimensions)
    }
}

/// Facts about an uploaded document recorded alongside its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub pages: usize,
    /// Hex SHA-256 of the uploaded bytes. Provenance only, never identity.
    pub content_sha256: String,
}

/// Metadata stored in every vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub document_id: DocumentId,
    pub document: DocumentInfo,
    pub embedding: EmbeddingFingerprint,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

/// One row of a vector index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A natural-language question aimed at one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub document_id: String,
    pub document_type: DocumentType,
}

/// A cited chunk in an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Original upload filename
    pub source: String,
    pub page_content: String,
}

impl From<&RetrievedChunk> for SourceRef {
    fn from(retrieved: &RetrievedChunk) -> Self {
        Self {
            source: retrieved.chunk.source.clone(),
            page_content: retrieved.chunk.text.clone(),
        }
    }
}

/// Answer to a query. `sources` is present only for PDF queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,
}

/// Result of a PDF upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfUpload {
    pub status: String,
    pub filename: String,
    /// Number of pages extracted
    pub doc_len: usize,
    /// Number of chunks indexed
    pub chunks: usize,
    pub unique_id: String,
}

/// Result of a CSV upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvUpload {
    pub status: String,
    pub filename: String,
    pub unique_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_ids_are_unique() {
        let a = DocumentId::new();
        let b = DocumentId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn test_document_id_round_trips_through_display() {
        let id = DocumentId::new();
        assert_eq!(DocumentId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_malformed_id_is_not_found() {
        for raw in ["", "abc", "../../etc/passwd", "123e4567-e89b-12d3-a456"] {
            match DocumentId::parse(raw) {
                Err(AppError::NotFound(_)) => {}
                other => panic!("expected NotFound for {:?}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_document_type_parse() {
        assert_eq!("PDF".parse::<DocumentType>().unwrap(), DocumentType::Pdf);
        assert_eq!("csv".parse::<DocumentType>().unwrap(), DocumentType::Csv);
        assert!(matches!(
            "docx".parse::<DocumentType>(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_answer_omits_sources_for_tables() {
        let answer = Answer {
            answer: "30".to_string(),
            sources: None,
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json, serde_json::json!({ "answer": "30" }));
    }
}
