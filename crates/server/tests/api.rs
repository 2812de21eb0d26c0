//! HTTP API tests driving the router in-process.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use docqa_core::{AppConfig, AppResult};
use docqa_knowledge::embeddings::providers::trigram::TrigramProvider;
use docqa_knowledge::KnowledgeService;
use docqa_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use docqa_server::{build_router, AppState};
use http_body_util::BodyExt;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "docqa-test-boundary";

/// Replies with the prompt it was given.
struct EchoLlm;

#[async_trait]
impl LlmClient for EchoLlm {
    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        Ok(LlmResponse {
            content: request.prompt.clone(),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let chunk = LlmStreamChunk {
            content: request.prompt.clone(),
            done: true,
            usage: None,
        };
        Ok(Box::pin(futures::stream::iter(vec![Ok(chunk)])))
    }
}

fn app(data_dir: &Path) -> Router {
    app_with_limit(data_dir, 50 * 1024 * 1024)
}

fn app_with_limit(data_dir: &Path, max_upload_bytes: usize) -> Router {
    let mut config = AppConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    config.embedding.provider = "trigram".to_string();
    config.embedding.model = "trigram-v1".to_string();
    config.embedding.dimensions = 256;

    let service = KnowledgeService::with_components(
        &config,
        Arc::new(TrigramProvider::new(256)),
        Arc::new(EchoLlm),
    )
    .unwrap();

    build_router(AppState::new(service), max_upload_bytes)
}

fn single_page_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn multipart_request(uri: &str, field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let temp = TempDir::new().unwrap();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app(temp.path()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_pdf_upload_then_query() {
    let temp = TempDir::new().unwrap();
    let app = app(temp.path());
    let pdf = single_page_pdf("The capital of France is Paris.");

    let (status, upload) = send(
        &app,
        multipart_request("/documents/pdf", "file", "paris.pdf", &pdf),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", upload);
    assert_eq!(upload["status"], "Successfully Uploaded");
    assert_eq!(upload["filename"], "paris.pdf");
    assert_eq!(upload["doc_len"], 1);
    assert_eq!(upload["chunks"], 1);

    let unique_id = upload["unique_id"].as_str().unwrap().to_string();
    let (status, answer) = send(
        &app,
        json_request(
            "/query/pdf",
            json!({ "query": "What is the capital of France?", "unique_id": unique_id }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", answer);
    assert!(answer["answer"].as_str().unwrap().contains("Paris"));
    let sources = answer["sources"].as_array().unwrap();
    assert_eq!(sources[0]["source"], "paris.pdf");
    assert!(sources[0]["page_content"]
        .as_str()
        .unwrap()
        .contains("The capital of France is Paris."));
}

#[tokio::test]
async fn test_unknown_id_is_404() {
    let temp = TempDir::new().unwrap();
    let app = app(temp.path());

    for uri in ["/query/pdf", "/query/csv", "/ask_pdf", "/ask_csv"] {
        let (status, body) = send(
            &app,
            json_request(
                uri,
                json!({ "query": "anything", "unique_id": "6f1c2a9e-3a1b-4c53-9a0e-2b7f1d2c3e4f" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["error"]["code"], "not_found");
        assert!(body["error"]["message"].is_string());
    }
}

#[tokio::test]
async fn test_csv_upload_and_query_via_legacy_routes() {
    let temp = TempDir::new().unwrap();
    let app = app(temp.path());

    let (status, upload) = send(
        &app,
        multipart_request("/csv", "file", "people.csv", b"name,age\nalice,25\nbob,35\n"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", upload);
    assert_eq!(upload["status"], "Successfully Uploaded");
    assert!(upload.get("doc_len").is_none());

    let (status, answer) = send(
        &app,
        json_request(
            "/ask_csv",
            json!({ "query": "What is the average age?", "unique_id": upload["unique_id"] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", answer);
    assert!(answer["answer"].as_str().unwrap().contains("mean 30"));
    assert!(answer.get("sources").is_none());
}

#[tokio::test]
async fn test_ask_text() {
    let temp = TempDir::new().unwrap();
    let app = app(temp.path());

    let (status, body) = send(&app, json_request("/ai", json!({ "query": "Say hello" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Say hello");

    let (status, body) = send(&app, json_request("/documents/text", json!({ "query": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_malformed_bodies_are_400() {
    let temp = TempDir::new().unwrap();
    let app = app(temp.path());

    let (status, body) = send(&app, json_request("/query/pdf", json!({ "query": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let request = Request::builder()
        .method("POST")
        .uri("/query/csv")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_validation() {
    let temp = TempDir::new().unwrap();
    let app = app(temp.path());

    let (status, body) = send(
        &app,
        multipart_request("/documents/pdf", "document", "paris.pdf", b"%PDF-1.5"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("file"));

    let (status, _) = send(
        &app,
        multipart_request("/pdf", "file", "notes.pdf", b"plain text, not a pdf"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        multipart_request("/documents/csv", "file", "bad.csv", b"name,age\nalice,25,x\n"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = json_request("/documents/pdf", json!({ "file": "nope" }));
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let temp = TempDir::new().unwrap();
    let app = app_with_limit(temp.path(), 1024);
    let big = vec![b'a'; 4096];

    let (status, _) = send(
        &app,
        multipart_request("/documents/csv", "file", "big.csv", &big),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
