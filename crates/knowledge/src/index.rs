//! SQLite-backed per-document vector index.
//!
//! Layout under the store root:
//! - `<id>/index.sqlite`: committed index
//! - `.staging-<id>/`: index being written, renamed into place on success

use crate::types::{Chunk, DocumentId, IndexEntry, IndexManifest, RetrievedChunk};
use crate::vector_index::{cosine_similarity, rank, IndexStore, VectorIndex};
use docqa_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// File name of the SQLite database inside each index directory.
pub const INDEX_FILE_NAME: &str = "index.sqlite";
const STAGING_PREFIX: &str = ".staging-";

const SCHEMA: &str = "
    CREATE TABLE manifest (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        body TEXT NOT NULL
    );

    CREATE TABLE chunks (
        position INTEGER PRIMARY KEY,
        page INTEGER NOT NULL,
        source TEXT NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL
    );
";

fn storage_err(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Storage(format!("{}: {}", context, e))
}

/// Filesystem directory of SQLite indices, one subdirectory per document.
#[derive(Debug, Clone)]
pub struct SqliteIndexStore {
    root: PathBuf,
}

impl SqliteIndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the committed index for `document_id`.
    pub fn index_dir(&self, document_id: &DocumentId) -> PathBuf {
        self.root.join(document_id.to_string())
    }

    fn staging_dir(&self, document_id: &DocumentId) -> PathBuf {
        self.root.join(format!("{}{}", STAGING_PREFIX, document_id))
    }

    fn commit(&self, manifest: &IndexManifest, entries: &[IndexEntry], staging: &Path) -> AppResult<()> {
        write_index(&staging.join(INDEX_FILE_NAME), manifest, entries)?;
        sync_dir(staging)?;

        let final_dir = self.index_dir(&manifest.document_id);
        fs::rename(staging, &final_dir).map_err(|e| {
            AppError::Storage(format!("Failed to publish index {:?}: {}", final_dir, e))
        })?;

        sync_dir(&self.root)
    }
}

impl IndexStore for SqliteIndexStore {
    #[tracing::instrument(skip_all, fields(document_id = %manifest.document_id, chunks = entries.len()))]
    fn create(&self, manifest: &IndexManifest, entries: &[IndexEntry]) -> AppResult<()> {
        let final_dir = self.index_dir(&manifest.document_id);
        if final_dir.exists() {
            return Err(AppError::Storage(format!(
                "Index already exists for document {}",
                manifest.document_id
            )));
        }

        fs::create_dir_all(&self.root).map_err(|e| {
            AppError::Storage(format!("Failed to create index root {:?}: {}", self.root, e))
        })?;

        let staging = self.staging_dir(&manifest.document_id);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        if let Err(e) = self.commit(manifest, entries, &staging) {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove staging index {:?}: {}", staging, cleanup);
                }
            }
            return Err(e);
        }

        tracing::info!("Index committed at {:?}", final_dir);
        Ok(())
    }

    fn open(&self, document_id: &DocumentId) -> AppResult<Box<dyn VectorIndex>> {
        let path = self.index_dir(document_id).join(INDEX_FILE_NAME);
        if !path.exists() {
            return Err(AppError::NotFound(format!(
                "No index for document '{}'",
                document_id
            )));
        }

        Ok(Box::new(SqliteIndex::open(&path)?))
    }

    fn exists(&self, document_id: &DocumentId) -> bool {
        self.index_dir(document_id).join(INDEX_FILE_NAME).is_file()
    }
}

/// Write the whole index inside one transaction.
fn write_index(path: &Path, manifest: &IndexManifest, entries: &[IndexEntry]) -> AppResult<()> {
    let mut conn = Connection::open(path).map_err(storage_err("Failed to create index"))?;

    conn.pragma_update(None, "synchronous", "FULL")
        .map_err(storage_err("Failed to configure index"))?;
    conn.execute_batch(SCHEMA)
        .map_err(storage_err("Failed to create index schema"))?;

    let tx = conn
        .transaction()
        .map_err(storage_err("Failed to start index transaction"))?;

    tx.execute(
        "INSERT INTO manifest (id, body) VALUES (1, ?1)",
        params![serde_json::to_string(manifest)?],
    )
    .map_err(storage_err("Failed to write manifest"))?;

    {
        let mut stmt = tx
            .prepare("INSERT INTO chunks (position, page, source, text, embedding) VALUES (?1, ?2, ?3, ?4, ?5)")
            .map_err(storage_err("Failed to prepare chunk insert"))?;

        for entry in entries {
            stmt.execute(params![
                entry.chunk.position as i64,
                entry.chunk.page,
                entry.chunk.source,
                entry.chunk.text,
                embedding_to_bytes(&entry.embedding),
            ])
            .map_err(storage_err("Failed to insert chunk"))?;
        }
    }

    tx.commit().map_err(storage_err("Failed to commit index"))?;

    conn.close()
        .map_err(|(_, e)| AppError::Storage(format!("Failed to close index: {}", e)))
}

/// Flush directory entries so a rename survives a crash.
fn sync_dir(dir: &Path) -> AppResult<()> {
    File::open(dir)
        .and_then(|handle| handle.sync_all())
        .map_err(|e| AppError::Storage(format!("Failed to sync {:?}: {}", dir, e)))
}

/// A committed index opened read-only.
pub struct SqliteIndex {
    conn: Connection,
    manifest: IndexManifest,
}

impl SqliteIndex {
    fn open(path: &Path) -> AppResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(storage_err("Failed to open index"))?;

        let body: Option<String> = conn
            .query_row("SELECT body FROM manifest WHERE id = 1", [], |row| row.get(0))
            .optional()
            .map_err(storage_err("Failed to read manifest"))?;

        let body = body.ok_or_else(|| {
            AppError::Storage(format!("Index {:?} has no manifest", path))
        })?;

        let manifest: IndexManifest = serde_json::from_str(&body)
            .map_err(|e| AppError::Storage(format!("Corrupt manifest in {:?}: {}", path, e)))?;

        Ok(Self { conn, manifest })
    }
}

impl VectorIndex for SqliteIndex {
    fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    fn len(&self) -> AppResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(storage_err("Failed to count chunks"))?;
        Ok(count as usize)
    }

    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> AppResult<Vec<RetrievedChunk>> {
        let mut stmt = self
            .conn
            .prepare("SELECT position, page, source, text, embedding FROM chunks ORDER BY position")
            .map_err(storage_err("Failed to prepare search"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                ))
            })
            .map_err(storage_err("Failed to scan chunks"))?;

        let mut scored = Vec::new();
        for row in rows {
            let (position, page, source, text, blob) = row.map_err(storage_err("Failed to read chunk"))?;
            let embedding = bytes_to_embedding(&blob)?;
            let score = cosine_similarity(query_embedding, &embedding);

            scored.push(RetrievedChunk {
                chunk: Chunk {
                    document_id: self.manifest.document_id,
                    position: position as usize,
                    page,
                    source,
                    text,
                },
                score,
            });
        }

        let total = scored.len();
        let ranked = rank(scored, top_k, min_score);

        tracing::debug!(
            "Scored {} chunks, {} passed threshold {:.2} (top_k {})",
            total,
            ranked.len(),
            min_score,
            top_k
        );

        Ok(ranked)
    }
}

/// Convert embedding vector to little-endian bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Storage("Invalid embedding bytes length".to_string()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
