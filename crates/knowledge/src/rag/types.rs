//! RAG result types.

use crate::types::{RetrievedChunk, SourceRef};

/// Answer returned when no chunk cleared the relevance threshold.
pub const NO_INFORMATION_ANSWER: &str =
    "I could not find information to answer this question in the document.";

/// Generated answer plus exactly the chunks that were fed as context.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub answer: String,
    pub chunks: Vec<RetrievedChunk>,
}

impl Synthesis {
    /// The fixed answer for an empty retrieval.
    pub fn no_information() -> Self {
        Self {
            answer: NO_INFORMATION_ANSWER.to_string(),
            chunks: Vec::new(),
        }
    }

    /// Source references in context order.
    pub fn sources(&self) -> Vec<SourceRef> {
        self.chunks.iter().map(SourceRef::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::chunk;
    use crate::types::DocumentId;

    #[test]
    fn test_no_information() {
        let synthesis = Synthesis::no_information();
        assert_eq!(synthesis.answer, NO_INFORMATION_ANSWER);
        assert!(synthesis.sources().is_empty());
    }

    #[test]
    fn test_sources_follow_chunk_order() {
        let id = DocumentId::new();
        let synthesis = Synthesis {
            answer: "Paris".to_string(),
            chunks: vec![
                RetrievedChunk {
                    chunk: chunk(id, 4, "second best"),
                    score: 0.4,
                },
                RetrievedChunk {
                    chunk: chunk(id, 1, "best"),
                    score: 0.9,
                },
            ],
        };

        let contents: Vec<String> = synthesis.sources().into_iter().map(|s| s.page_content).collect();
        assert_eq!(contents, vec!["second best", "best"]);
    }
}
