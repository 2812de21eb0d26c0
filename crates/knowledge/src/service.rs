//! Document question answering service.
//!
//! [`KnowledgeService`] owns every pipeline stage and is shared by the HTTP
//! server and the CLI. It is built once at startup; the embedder and the LLM
//! client inside it are process-wide and stateless per request.

use crate::chunker::Chunker;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index::SqliteIndexStore;
use crate::ingest::Ingestor;
use crate::parser::{extract_pdf_pages, looks_like_pdf, sha256_hex};
use crate::rag::AnswerSynthesizer;
use crate::retriever::Retriever;
use crate::store::DocumentStore;
use crate::tabular::{LlmTableAgent, Table, TableAgent};
use crate::types::{
    Answer, CsvUpload, DocumentId, DocumentInfo, DocumentType, PdfUpload, Query, UPLOAD_STATUS,
};
use crate::vector_index::{join_error, IndexStore};
use docqa_core::{AppConfig, AppError, AppResult};
use docqa_llm::{create_client, LlmClient, LlmRequest};
use docqa_prompt::{load_prompt, RAG_ANSWER, TABLE_ANSWER};
use std::sync::Arc;

pub struct KnowledgeService {
    store: DocumentStore,
    chunker: Chunker,
    ingestor: Ingestor,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    table_agent: Arc<dyn TableAgent>,
    llm: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
}

impl KnowledgeService {
    /// Build the service with the configured embedder and LLM provider.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let embedder = create_provider(&config.embedding, config.embedding_endpoint())?;
        let llm = create_client(&config.llm)?;

        tracing::info!(
            "Using embedder {} and LLM {}/{}",
            embedder.fingerprint(),
            llm.provider_name(),
            config.llm.model
        );

        Self::with_components(config, embedder, llm)
    }

    /// Build the service around an explicit embedder and LLM client.
    pub fn with_components(
        config: &AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        let prompts_dir = config.prompts_dir();
        let rag_prompt = load_prompt(&prompts_dir, RAG_ANSWER)?;
        let table_prompt = load_prompt(&prompts_dir, TABLE_ANSWER)?;

        let store = DocumentStore::new(&config.data_dir);
        let index_store: Arc<dyn IndexStore> = Arc::new(SqliteIndexStore::new(store.index_root()));

        let model = config.llm.model.clone();
        let temperature = config.llm.temperature;

        Ok(Self {
            chunker: Chunker::from_settings(&config.chunking)?,
            ingestor: Ingestor::new(
                index_store.clone(),
                embedder.clone(),
                config.embedding.batch_size,
            ),
            retriever: Retriever::new(index_store, embedder, &config.retrieval),
            synthesizer: AnswerSynthesizer::new(llm.clone(), model.clone(), temperature, rag_prompt),
            table_agent: Arc::new(LlmTableAgent::new(
                llm.clone(),
                model.clone(),
                temperature,
                table_prompt,
            )),
            store,
            llm,
            model,
            temperature,
        })
    }

    /// Replace the agent answering CSV questions.
    pub fn with_table_agent(mut self, table_agent: Arc<dyn TableAgent>) -> Self {
        self.table_agent = table_agent;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Send `query` verbatim to the model, without retrieval.
    pub async fn ask_text(&self, query: &str) -> AppResult<String> {
        require_query(query)?;

        let request = LlmRequest::new(query, self.model.clone()).with_temperature(self.temperature);
        let response = self.llm.complete(&request).await?;
        Ok(response.content.trim().to_string())
    }

    /// Store, extract, chunk, embed and index a PDF.
    ///
    /// Returns only once the index is durable. On failure nothing of the
    /// upload remains on disk.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_pdf(&self, filename: &str, bytes: Vec<u8>) -> AppResult<PdfUpload> {
        if !looks_like_pdf(&bytes) {
            return Err(AppError::BadRequest(
                "Unsupported file type: expected a PDF document".to_string(),
            ));
        }

        let filename = display_name(filename, DocumentType::Pdf);
        let (id, bytes) = self.register(bytes, DocumentType::Pdf).await?;
        let upload = PendingUpload::new(&self.store, id, DocumentType::Pdf);

        match self.index_pdf(&id, &filename, bytes).await {
            Ok((pages, chunks)) => {
                upload.keep();
                tracing::info!(
                    "Uploaded {} as {} ({} pages, {} chunks)",
                    filename,
                    id,
                    pages,
                    chunks
                );
                Ok(PdfUpload {
                    status: UPLOAD_STATUS.to_string(),
                    filename,
                    doc_len: pages,
                    chunks,
                    unique_id: id.to_string(),
                })
            }
            Err(e) => {
                tracing::warn!("Ingestion of {} failed: {}", filename, e);
                Err(e)
            }
        }
    }

    /// Store the raw upload under a fresh identifier, off the runtime threads.
    async fn register(
        &self,
        bytes: Vec<u8>,
        document_type: DocumentType,
    ) -> AppResult<(DocumentId, Vec<u8>)> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            store
                .register(&bytes, document_type)
                .map(|id| (id, bytes))
        })
        .await
        .map_err(join_error)?
    }

    async fn index_pdf(
        &self,
        id: &DocumentId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> AppResult<(usize, usize)> {
        let info = DocumentInfo {
            filename: filename.to_string(),
            pages: 0,
            content_sha256: sha256_hex(&bytes),
        };

        let pages = extract_pdf_pages(bytes).await?;
        let chunks = self.chunker.chunk_pages(*id, filename, &pages);

        let info = DocumentInfo {
            pages: pages.len(),
            ..info
        };
        let manifest = self.ingestor.ingest(id, &info, &chunks).await?;

        Ok((pages.len(), manifest.chunk_count))
    }

    /// Validate and store a CSV table.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_csv(&self, filename: &str, bytes: Vec<u8>) -> AppResult<CsvUpload> {
        let table = Table::parse(&bytes)?;
        let filename = display_name(filename, DocumentType::Csv);
        let (id, _) = self.register(bytes, DocumentType::Csv).await?;

        tracing::info!(
            "Uploaded {} as {} ({} rows, {} columns)",
            filename,
            id,
            table.row_count(),
            table.headers.len()
        );

        Ok(CsvUpload {
            status: UPLOAD_STATUS.to_string(),
            filename,
            unique_id: id.to_string(),
        })
    }

    /// Answer a question from one PDF's retrieved chunks.
    #[tracing::instrument(skip(self, query))]
    pub async fn query_pdf(&self, query: &str, unique_id: &str) -> AppResult<Answer> {
        let id = self.locate(unique_id, DocumentType::Pdf)?;
        require_query(query)?;

        let retrieved = self.retriever.retrieve(&id, query).await?;
        let synthesis = self.synthesizer.synthesize(query, retrieved).await?;

        Ok(Answer {
            sources: Some(synthesis.sources()),
            answer: synthesis.answer,
        })
    }

    /// Answer a question over a whole CSV table.
    #[tracing::instrument(skip(self, query))]
    pub async fn query_csv(&self, query: &str, unique_id: &str) -> AppResult<Answer> {
        let id = self.locate(unique_id, DocumentType::Csv)?;
        require_query(query)?;

        let store = self.store.clone();
        let bytes = tokio::task::spawn_blocking(move || store.read_raw(&id, DocumentType::Csv))
            .await
            .map_err(join_error)??;
        let table = Table::parse(&bytes).map_err(|e| {
            AppError::Storage(format!("Stored table {} is no longer readable: {}", id, e))
        })?;

        let answer = self.table_agent.answer(&table, query).await?;

        Ok(Answer {
            answer,
            sources: None,
        })
    }

    /// Dispatch a query on its document type.
    pub async fn answer(&self, query: &Query) -> AppResult<Answer> {
        match query.document_type {
            DocumentType::Pdf => self.query_pdf(&query.text, &query.document_id).await,
            DocumentType::Csv => self.query_csv(&query.text, &query.document_id).await,
        }
    }

    /// Resolve a client-supplied identifier to an existing document.
    fn locate(&self, unique_id: &str, document_type: DocumentType) -> AppResult<DocumentId> {
        let id = DocumentId::parse(unique_id)?;
        if !self.store.exists(&id, document_type) {
            return Err(AppError::NotFound(format!(
                "No {} document with identifier '{}'",
                document_type, unique_id
            )));
        }
        Ok(id)
    }
}

/// Removes a registered upload when dropped, unless kept. Covers both a
/// failed ingestion and a caller that stops waiting halfway through.
struct PendingUpload<'a> {
    store: &'a DocumentStore,
    id: DocumentId,
    document_type: DocumentType,
    kept: bool,
}

impl<'a> PendingUpload<'a> {
    fn new(store: &'a DocumentStore, id: DocumentId, document_type: DocumentType) -> Self {
        Self {
            store,
            id,
            document_type,
            kept: false,
        }
    }

    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for PendingUpload<'_> {
    fn drop(&mut self) {
        if !self.kept {
            tracing::debug!("Discarding unfinished upload {}", self.id);
            self.store.discard(&self.id, self.document_type);
        }
    }
}

fn require_query(query: &str) -> AppResult<()> {
    if query.trim().is_empty() {
        return Err(AppError::BadRequest("Query must not be empty".to_string()));
    }
    Ok(())
}

fn display_name(filename: &str, document_type: DocumentType) -> String {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        format!("upload.{}", document_type.extension())
    } else {
        trimmed.to_string()
    }
}
