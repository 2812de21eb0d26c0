//! Ingest command handler.
//!
//! Uploads a local file through the same path the HTTP upload routes use,
//! so the printed `unique_id` works against a running server sharing the
//! data directory.

use clap::Args;
use docqa_core::{config::AppConfig, AppError, AppResult};
use docqa_knowledge::{DocumentType, KnowledgeService};
use std::path::{Path, PathBuf};

/// Upload a local PDF or CSV
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// File to upload (.pdf or .csv)
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    /// Execute the ingest command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");
        tracing::debug!("Ingest command options: {:?}", self);

        let document_type = document_type_for(&self.path)?;
        let bytes = std::fs::read(&self.path).map_err(|e| {
            AppError::BadRequest(format!("Failed to read {:?}: {}", self.path, e))
        })?;
        let filename = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        config.ensure_data_dir()?;
        let service = KnowledgeService::from_config(config)?;

        match document_type {
            DocumentType::Pdf => {
                let upload = service.upload_pdf(&filename, bytes).await?;
                if self.json {
                    super::print_json(&upload)?;
                } else {
                    println!("{}: {}", upload.status, upload.filename);
                    println!("  Pages:     {}", upload.doc_len);
                    println!("  Chunks:    {}", upload.chunks);
                    println!("  Unique id: {}", upload.unique_id);
                }
            }
            DocumentType::Csv => {
                let upload = service.upload_csv(&filename, bytes).await?;
                if self.json {
                    super::print_json(&upload)?;
                } else {
                    println!("{}: {}", upload.status, upload.filename);
                    println!("  Unique id: {}", upload.unique_id);
                }
            }
        }

        Ok(())
    }
}

/// Pick the document type from the file extension.
fn document_type_for(path: &Path) -> AppResult<DocumentType> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => Ok(DocumentType::Pdf),
        Some("csv") => Ok(DocumentType::Csv),
        _ => Err(AppError::BadRequest(format!(
            "Cannot tell the document type of {:?}: expected a .pdf or .csv file",
            path
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_from_extension() {
        assert_eq!(
            document_type_for(Path::new("report.PDF")).unwrap(),
            DocumentType::Pdf
        );
        assert_eq!(
            document_type_for(Path::new("data/people.csv")).unwrap(),
            DocumentType::Csv
        );
        assert!(matches!(
            document_type_for(Path::new("notes.txt")),
            Err(AppError::BadRequest(_))
        ));
        assert!(document_type_for(Path::new("README")).is_err());
    }
}
