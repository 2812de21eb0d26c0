//! Upload endpoints and the generic model ask.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use docqa_knowledge::{CsvUpload, PdfUpload};
use serde::{Deserialize, Serialize};

const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub answer: String,
}

/// POST /documents/text
pub async fn ask_text(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<TextResponse>, ApiError> {
    let Json(request) = body?;
    let answer = state.service.ask_text(&request.query).await?;
    Ok(Json(TextResponse { answer }))
}

/// POST /documents/pdf
pub async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PdfUpload>, ApiError> {
    let (filename, bytes) = read_file_field(multipart?).await?;
    tracing::info!("Received PDF upload {} ({} bytes)", filename, bytes.len());

    let upload = state.service.upload_pdf(&filename, bytes).await?;
    Ok(Json(upload))
}

/// POST /documents/csv
pub async fn upload_csv(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CsvUpload>, ApiError> {
    let (filename, bytes) = read_file_field(multipart?).await?;
    tracing::info!("Received CSV upload {} ({} bytes)", filename, bytes.len());

    let upload = state.service.upload_csv(&filename, bytes).await?;
    Ok(Json(upload))
}

/// Read the `file` field, ignoring any others.
async fn read_file_field(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        return Ok((filename, bytes.to_vec()));
    }

    Err(ApiError::bad_request(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}
