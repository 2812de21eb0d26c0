//! Text extraction from uploaded PDFs.

use docqa_core::{AppError, AppResult};
use sha2::{Digest, Sha256};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Whether `bytes` start with the PDF header.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Extract the text of every page, in page order.
///
/// `pdf-extract` runs first on the blocking pool. If it fails or panics the
/// document is reloaded with `lopdf` and extracted page by page. A page
/// without text yields an empty string so the page count stays exact.
pub async fn extract_pdf_pages(bytes: Vec<u8>) -> AppResult<Vec<String>> {
    if !looks_like_pdf(&bytes) {
        return Err(AppError::BadRequest(
            "Unsupported file type: expected a PDF document".to_string(),
        ));
    }

    let pages = tokio::task::spawn_blocking(move || {
        match pdf_extract::extract_text_from_mem_by_pages(&bytes) {
            Ok(pages) => Ok(pages),
            Err(e) => {
                tracing::warn!("pdf-extract failed: {}, trying fallback", e);
                extract_with_lopdf(&bytes)
            }
        }
    })
    .await;

    let pages = match pages {
        Ok(result) => result?,
        Err(join_error) => {
            // pdf-extract panics on some malformed fonts; the bytes went with it.
            tracing::error!("PDF extraction thread crashed: {}", join_error);
            return Err(AppError::BadRequest(
                "PDF could not be read: extraction crashed".to_string(),
            ));
        }
    };

    Ok(pages.iter().map(|page| clean_page_text(page)).collect())
}

fn extract_with_lopdf(bytes: &[u8]) -> AppResult<Vec<String>> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| AppError::BadRequest(format!("PDF could not be read: {}", e)))?;

    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                tracing::debug!("No text on page {}: {}", page_number, e);
                pages.push(String::new());
            }
        }
    }

    Ok(pages)
}

/// Strip NUL characters and trim each line. Runs of blank lines collapse
/// to one, so paragraph breaks survive as `"\n\n"`.
fn clean_page_text(text: &str) -> String {
    let mut cleaned = String::new();
    let mut after_blank = false;

    for line in text.replace('\0', "").lines().map(str::trim) {
        if line.is_empty() {
            after_blank = true;
            continue;
        }
        if !cleaned.is_empty() {
            cleaned.push_str(if after_blank { "\n\n" } else { "\n" });
        }
        cleaned.push_str(line);
        after_blank = false;
    }

    cleaned
}
