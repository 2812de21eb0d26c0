//! HTTP routes.

pub mod documents;
pub mod query;

use crate::AppState;
use axum::routing::post;
use axum::Router;

/// Upload and query routes, plus the legacy aliases that map onto them.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/documents/text", post(documents::ask_text))
        .route("/documents/pdf", post(documents::upload_pdf))
        .route("/documents/csv", post(documents::upload_csv))
        .route("/query/pdf", post(query::query_pdf))
        .route("/query/csv", post(query::query_csv))
        // Legacy paths
        .route("/ai", post(documents::ask_text))
        .route("/pdf", post(documents::upload_pdf))
        .route("/csv", post(documents::upload_csv))
        .route("/ask_pdf", post(query::query_pdf))
        .route("/ask_csv", post(query::query_csv))
}
