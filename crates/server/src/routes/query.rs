//! Document query endpoints.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use docqa_knowledge::Answer;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub unique_id: String,
}

/// POST /query/pdf
pub async fn query_pdf(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(request) = body?;
    let answer = state
        .service
        .query_pdf(&request.query, &request.unique_id)
        .await?;
    Ok(Json(answer))
}

/// POST /query/csv
pub async fn query_csv(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(request) = body?;
    let answer = state
        .service
        .query_csv(&request.query, &request.unique_id)
        .await?;
    Ok(Json(answer))
}
