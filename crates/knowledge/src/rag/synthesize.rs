//! Stuffed-context answer synthesis.

use crate::rag::types::Synthesis;
use crate::types::RetrievedChunk;
use docqa_core::AppResult;
use docqa_llm::{LlmClient, LlmRequest};
use docqa_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Turns a query and its retrieved chunks into one model call.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    prompt: PromptDefinition,
}

impl AnswerSynthesizer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        temperature: f32,
        prompt: PromptDefinition,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature,
            prompt,
        }
    }

    /// Answer `query` from `chunks`, in the order given.
    ///
    /// With no chunks the model is not called and the fixed no-information
    /// answer is returned. Model failures are not retried.
    #[tracing::instrument(skip_all, fields(chunks = chunks.len(), model = %self.model))]
    pub async fn synthesize(&self, query: &str, chunks: Vec<RetrievedChunk>) -> AppResult<Synthesis> {
        if chunks.is_empty() {
            tracing::info!("No context for query, returning no-information answer");
            return Ok(Synthesis::no_information());
        }

        let context = build_context(&chunks);

        let mut variables = HashMap::new();
        variables.insert("input".to_string(), query.to_string());
        variables.insert("context".to_string(), context);
        let built = build_prompt(&self.prompt, variables)?;

        let request = LlmRequest::new(built.text, self.model.clone()).with_temperature(self.temperature);
        let response = self.llm.complete(&request).await?;

        tracing::debug!(
            "Generated answer of {} chars ({} total tokens)",
            response.content.len(),
            response.usage.total_tokens
        );

        Ok(Synthesis {
            answer: response.content,
            chunks,
        })
    }
}

/// Chunk texts joined by blank lines.
fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{chunk, EchoLlm, FailingLlm, ScriptedLlm};
    use crate::types::DocumentId;
    use docqa_core::AppError;
    use docqa_prompt::{builtin_prompt, RAG_ANSWER};

    fn retrieved(texts: &[&str]) -> Vec<RetrievedChunk> {
        let id = DocumentId::new();
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| RetrievedChunk {
                chunk: chunk(id, i, text),
                score: 0.9 - i as f32 * 0.1,
            })
            .collect()
    }

    fn synthesizer(llm: Arc<dyn LlmClient>) -> AnswerSynthesizer {
        AnswerSynthesizer::new(llm, "llama3", 0.7, builtin_prompt(RAG_ANSWER).unwrap())
    }

    #[tokio::test]
    async fn test_prompt_contains_query_and_context() {
        let synthesis = synthesizer(Arc::new(EchoLlm))
            .synthesize(
                "What is the capital of France?",
                retrieved(&["The capital of France is Paris.", "Lyon is a city."]),
            )
            .await
            .unwrap();

        assert!(synthesis.answer.starts_with("<s>[INST] You are a technical assistant"));
        assert!(synthesis.answer.contains(
            "What is the capital of France? Context: The capital of France is Paris.\n\nLyon is a city. Answer:"
        ));
        assert_eq!(synthesis.chunks.len(), 2);
    }

    #[tokio::test]
    async fn test_answer_is_returned_verbatim() {
        let llm = Arc::new(ScriptedLlm::new("  Paris.\n"));
        let synthesis = synthesizer(llm.clone())
            .synthesize("capital?", retrieved(&["The capital of France is Paris."]))
            .await
            .unwrap();

        assert_eq!(synthesis.answer, "  Paris.\n");
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_chunks_skips_model() {
        let llm = Arc::new(ScriptedLlm::new("should not be used"));
        let synthesis = synthesizer(llm.clone())
            .synthesize("capital?", Vec::new())
            .await
            .unwrap();

        assert_eq!(synthesis.answer, crate::rag::NO_INFORMATION_ANSWER);
        assert!(synthesis.chunks.is_empty());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_is_service_unavailable() {
        let result = synthesizer(Arc::new(FailingLlm))
            .synthesize("capital?", retrieved(&["text"]))
            .await;
        assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    }
}
