//! HTTP front end for docqa.
//!
//! Thin axum handlers over [`KnowledgeService`]. Every error leaves as a JSON
//! body with a stable code; see [`error::ApiError`].

pub mod error;
pub mod routes;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use docqa_core::{AppConfig, AppError, AppResult};
use docqa_knowledge::KnowledgeService;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<KnowledgeService>,
}

impl AppState {
    pub fn new(service: KnowledgeService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the application router.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::api_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until ctrl-c.
pub async fn run(config: &AppConfig) -> AppResult<()> {
    config.ensure_data_dir()?;

    let service = KnowledgeService::from_config(config)?;
    let router = build_router(AppState::new(service), config.server.max_upload_bytes);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", address, e)))?;

    tracing::info!("docqa listening on http://{}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Other(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
