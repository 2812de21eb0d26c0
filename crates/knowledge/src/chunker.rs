//! Text chunking with configurable size and overlap.
//!
//! Splitting prefers the coarsest natural boundary that fits: paragraphs,
//! then lines, sentences, words and finally characters. Sizes are counted
//! in characters, not bytes.
//!
//! The splitter cuts pieces of `chunk_size - overlap` characters. Each piece
//! after the first on a page is then extended backwards over the tail of the
//! previous one, starting at a word boundary where there is one, so
//! neighbouring chunks always share text and no chunk exceeds `chunk_size`.

use crate::types::{Chunk, DocumentId};
use docqa_core::config::ChunkingSettings;
use docqa_core::{AppError, AppResult};
use std::fmt;
use text_splitter::{Characters, ChunkConfig, TextSplitter};

/// Deterministic recursive splitter.
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
    splitter: TextSplitter<Characters>,
}

impl Chunker {
    /// Create a chunker producing pieces of at most `chunk_size` characters,
    /// with up to `overlap` characters shared between neighbours.
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config("Chunk size must be greater than zero".to_string()));
        }
        if overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "Invalid chunk overlap: {} must be smaller than chunk size {}",
                overlap, chunk_size
            )));
        }

        let config = ChunkConfig::new(chunk_size - overlap).with_trim(true);

        Ok(Self {
            chunk_size,
            overlap,
            splitter: TextSplitter::new(config),
        })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> AppResult<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split one block of text. Chunks are attributed to page 1.
    ///
    /// Empty or whitespace-only text yields no chunks.
    pub fn chunk(&self, document_id: DocumentId, source: &str, text: &str) -> Vec<Chunk> {
        self.chunk_pages(document_id, source, &[text.to_string()])
    }

    /// Split a paged document. Each page is split on its own; positions run
    /// on across pages so they stay unique within the document.
    pub fn chunk_pages(&self, document_id: DocumentId, source: &str, pages: &[String]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for (page_index, page_text) in pages.iter().enumerate() {
            // Byte span of the previous chunk on this page
            let mut previous: Option<(usize, usize)> = None;

            for (start, piece) in self.splitter.chunk_indices(page_text) {
                if piece.trim().is_empty() {
                    continue;
                }
                let end = start + piece.len();
                let span_start = match previous {
                    Some(prev) => self.carry_start(page_text, prev, start, piece),
                    None => start,
                };

                chunks.push(Chunk {
                    document_id,
                    position: chunks.len(),
                    page: page_index as u32 + 1,
                    source: source.to_string(),
                    text: page_text[span_start..end].to_string(),
                });
                previous = Some((span_start, end));
            }
        }

        tracing::debug!(
            "Chunked {} pages into {} chunks (size: {}, overlap: {})",
            pages.len(),
            chunks.len(),
            self.chunk_size,
            self.overlap
        );

        chunks
    }

    /// Byte offset where the chunk for `piece` starts once it takes over the
    /// tail of the previous chunk `(prev_start, prev_end)`.
    fn carry_start(
        &self,
        text: &str,
        (prev_start, prev_end): (usize, usize),
        piece_start: usize,
        piece: &str,
    ) -> usize {
        if piece_start < prev_end {
            return piece_start;
        }

        let gap = text[prev_end..piece_start].chars().count();
        let budget = self
            .overlap
            .min(self.chunk_size.saturating_sub(piece.chars().count() + gap));
        if budget == 0 {
            return piece_start;
        }

        let tail_start = text[prev_start..prev_end]
            .char_indices()
            .rev()
            .nth(budget - 1)
            .map(|(i, _)| prev_start + i)
            .unwrap_or(prev_start);
        let tail = &text[tail_start..prev_end];

        let mid_word = text[..tail_start]
            .chars()
            .next_back()
            .is_some_and(|c| !c.is_whitespace());
        let offset = if mid_word {
            // Skip the cut word; a tail that is one unbroken word is kept whole.
            tail.char_indices()
                .skip_while(|(_, c)| !c.is_whitespace())
                .find(|(_, c)| !c.is_whitespace())
                .map(|(i, _)| i)
                .unwrap_or(0)
        } else {
            tail.len() - tail.trim_start().len()
        };

        tail_start + offset
    }
}

impl fmt::Debug for Chunker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunker")
            .field("chunk_size", &self.chunk_size)
            .field("overlap", &self.overlap)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_chunker() -> Chunker {
        Chunker::new(1024, 80).unwrap()
    }

    /// One long paragraph of unique tokens, so shared tokens prove overlap.
    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|i| format!("w{:04}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let chunker = default_chunker();
        let id = DocumentId::new();
        assert!(chunker.chunk(id, "a.pdf", "").is_empty());
        assert!(chunker.chunk(id, "a.pdf", "   \n\n\t ").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = default_chunker();
        let id = DocumentId::new();
        let chunks = chunker.chunk(id, "paris.pdf", "The capital of France is Paris.");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "The capital of France is Paris.");
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].source, "paris.pdf");
        assert_eq!(chunks[0].document_id, id);
    }

    #[test]
    fn test_chunks_respect_size_limit() {
        let chunker = default_chunker();
        let text = format!(
            "{}\n\n{}\n{}",
            numbered_words(400),
            "x".repeat(3000),
            numbered_words(150)
        );
        let chunks = chunker.chunk(DocumentId::new(), "big.pdf", &text);

        assert!(chunks.len() > 3);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 1024);
            assert!(!chunk.text.trim().is_empty());
        }
    }

    #[test]
    fn test_multibyte_text_counts_characters() {
        let chunker = Chunker::new(10, 2).unwrap();
        let text = "é".repeat(35);
        let chunks = chunker.chunk(DocumentId::new(), "accents.pdf", &text);
        assert!(chunks.len() >= 4);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 10));
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let chunker = default_chunker();
        let id = DocumentId::new();
        let text = numbered_words(900);

        let first = chunker.chunk(id, "doc.pdf", &text);
        let second = chunker.chunk(id, "doc.pdf", &text);
        assert_eq!(first, second);
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunker = default_chunker();
        let text = numbered_words(900);
        let chunks = chunker.chunk(DocumentId::new(), "doc.pdf", &text);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let first_word = pair[1].text.split_whitespace().next().unwrap();
            let tail: String = {
                let chars: Vec<char> = pair[0].text.chars().collect();
                chars[chars.len().saturating_sub(80)..].iter().collect()
            };
            assert!(
                tail.contains(first_word),
                "chunk {} does not start inside the tail of chunk {}",
                pair[1].position,
                pair[0].position
            );
        }
    }

    /// `count` paragraphs of about 490 characters, words unique per paragraph.
    fn paragraphs(count: usize, separator: &str) -> String {
        (0..count)
            .map(|p| {
                (0..70)
                    .map(|w| format!("p{:02}w{:02}", p, w))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    #[test]
    fn test_paragraph_and_line_breaks_still_overlap() {
        let chunker = default_chunker();

        for separator in ["\n\n", "\n"] {
            let text = paragraphs(12, separator);
            let chunks = chunker.chunk(DocumentId::new(), "doc.pdf", &text);

            assert!(chunks.len() > 1, "separator {:?}", separator);
            for chunk in &chunks {
                assert!(chunk.text.chars().count() <= 1024);
                assert!(text.contains(&chunk.text), "chunk is not a span of the text");
            }
            for pair in chunks.windows(2) {
                let first_word = pair[1].text.split_whitespace().next().unwrap();
                let chars: Vec<char> = pair[0].text.chars().collect();
                let tail: String = chars[chars.len().saturating_sub(80)..].iter().collect();
                assert!(
                    tail.contains(first_word),
                    "chunks {} and {} share nothing (separator {:?})",
                    pair[0].position,
                    pair[1].position,
                    separator
                );
            }
        }
    }

    #[test]
    fn test_unbroken_text_overlaps_mid_word() {
        let chunker = Chunker::new(100, 10).unwrap();
        let text = "x".repeat(500);
        let chunks = chunker.chunk(DocumentId::new(), "blob.pdf", &text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 100);
        }
        let covered: usize = chunks.iter().map(|c| c.text.len()).sum();
        assert!(covered > text.len());
    }

    #[test]
    fn test_pages_keep_numbers_and_positions_continue() {
        let chunker = Chunker::new(50, 5).unwrap();
        let pages = vec![
            numbered_words(20),
            String::new(),
            "Last page sentence.".to_string(),
        ];
        let chunks = chunker.chunk_pages(DocumentId::new(), "paged.pdf", &pages);

        let positions: Vec<usize> = chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, (0..chunks.len()).collect::<Vec<_>>());
        assert!(chunks.iter().any(|c| c.page == 1));
        assert!(!chunks.iter().any(|c| c.page == 2));
        assert_eq!(chunks.last().unwrap().page, 3);
        assert_eq!(chunks.last().unwrap().text, "Last page sentence.");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        assert!(Chunker::new(80, 80).is_err());
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(1024, 80).is_ok());
    }
}
