//! Raw upload storage and document identity.
//!
//! Layout under the data directory:
//!
//! ```text
//! pdf/<id>.pdf
//! csv/<id>.csv
//! db/<id>/index.sqlite
//! ```
//!
//! Identifiers are fresh UUIDs, never derived from filename or content, so
//! uploading the same bytes twice yields two independent documents.

use crate::types::{DocumentId, DocumentType};
use docqa_core::{AppError, AppResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join("pdf")
    }

    pub fn csv_dir(&self) -> PathBuf {
        self.root.join("csv")
    }

    /// Parent directory of every per-document index.
    pub fn index_root(&self) -> PathBuf {
        self.root.join("db")
    }

    fn type_dir(&self, document_type: DocumentType) -> PathBuf {
        match document_type {
            DocumentType::Pdf => self.pdf_dir(),
            DocumentType::Csv => self.csv_dir(),
        }
    }

    /// Location of the stored upload.
    pub fn raw_path(&self, id: &DocumentId, document_type: DocumentType) -> PathBuf {
        self.type_dir(document_type)
            .join(format!("{}.{}", id, document_type.extension()))
    }

    /// Issue a new identifier and durably write the uploaded bytes under it.
    pub fn register(&self, bytes: &[u8], document_type: DocumentType) -> AppResult<DocumentId> {
        let dir = self.type_dir(document_type);
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::Storage(format!("Failed to create directory {:?}: {}", dir, e))
        })?;

        let id = DocumentId::new();
        let path = self.raw_path(&id, document_type);

        // create_new: a v4 collision must never clobber an existing upload.
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| AppError::Storage(format!("Failed to create {:?}: {}", path, e)))?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| AppError::Storage(format!("Failed to write {:?}: {}", path, e)))?;

        tracing::debug!("Registered {} document {} ({} bytes)", document_type, id, bytes.len());

        Ok(id)
    }

    /// Whether a document of this type is queryable under `id`.
    ///
    /// A PDF counts only once its index is committed; a CSV as soon as the
    /// raw file is stored.
    pub fn exists(&self, id: &DocumentId, document_type: DocumentType) -> bool {
        match document_type {
            DocumentType::Pdf => self
                .index_root()
                .join(id.to_string())
                .join(crate::index::INDEX_FILE_NAME)
                .is_file(),
            DocumentType::Csv => self.raw_path(id, document_type).is_file(),
        }
    }

    /// Remove everything stored for an upload that did not complete: the raw
    /// file and, for a PDF, any committed index.
    pub fn discard(&self, id: &DocumentId, document_type: DocumentType) {
        let path = self.raw_path(id, document_type);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {:?}: {}", path, e);
            }
        }

        if document_type == DocumentType::Pdf {
            let index_dir = self.index_root().join(id.to_string());
            if let Err(e) = fs::remove_dir_all(&index_dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove {:?}: {}", index_dir, e);
                }
            }
        }
    }

    /// Read a stored upload. Missing files are `NotFound`.
    pub fn read_raw(&self, id: &DocumentId, document_type: DocumentType) -> AppResult<Vec<u8>> {
        let path = self.raw_path(id, document_type);
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("No {} document with identifier '{}'", document_type, id))
            }
            _ => AppError::Storage(format!("Failed to read {:?}: {}", path, e)),
        })
    }
}
