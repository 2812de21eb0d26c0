//! Ollama text generation provider.
//!
//! Talks to the `/api/generate` endpoint of a local or remote Ollama runtime.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use docqa_core::{AppError, AppResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const GENERATE_ENDPOINT: &str = "/api/generate";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "OllamaOptions::is_empty")]
    options: OllamaOptions,
}

/// Sampling parameters. Ollama reads these from `options`, not the top level.
#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl OllamaOptions {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.num_predict.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Client for `http://localhost:11434` with the default timeout.
    pub fn new() -> AppResult<Self> {
        Self::with_base_url(DEFAULT_OLLAMA_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Client for a custom base URL. `timeout` bounds each whole request.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn to_ollama_request(&self, request: &LlmRequest, stream: bool) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            stream,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    fn convert_response(&self, response: OllamaResponse) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        LlmResponse {
            content: response.response,
            model: response.model,
            usage,
        }
    }

    async fn send(&self, body: &OllamaRequest) -> AppResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, GENERATE_ENDPOINT);

        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::ServiceUnavailable(format!("Ollama request timed out: {}", e))
            } else {
                AppError::ServiceUnavailable(format!("Failed to reach Ollama at {}: {}", url, e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ServiceUnavailable(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[tracing::instrument(skip(self, request), fields(model = %request.model, prompt_len = request.prompt.len()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending completion request to Ollama");

        let body = self.to_ollama_request(request, false);
        let response = self.send(&body).await?;

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            AppError::ServiceUnavailable(format!("Failed to parse Ollama response: {}", e))
        })?;

        tracing::info!(
            prompt_tokens = ollama_response.prompt_eval_count.unwrap_or(0),
            completion_tokens = ollama_response.eval_count.unwrap_or(0),
            "Received completion from Ollama"
        );

        Ok(self.convert_response(ollama_response))
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!(model = %request.model, "Starting streaming request to Ollama");

        let body = self.to_ollama_request(request, true);
        let response = self.send(&body).await?;

        // Ollama sends newline-delimited JSON objects
        let stream = response.bytes_stream().map(|result| {
            let bytes = result
                .map_err(|e| AppError::ServiceUnavailable(format!("Stream error: {}", e)))?;

            let text = String::from_utf8_lossy(&bytes);
            let chunks: Vec<AppResult<LlmStreamChunk>> = text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(parse_stream_line)
                .collect();

            Ok(futures::stream::iter(chunks))
        });

        Ok(Box::pin(stream.flat_map(|result| match result {
            Ok(chunks) => chunks,
            Err(e) => futures::stream::iter(vec![Err(e)]),
        })))
    }
}

fn parse_stream_line(line: &str) -> AppResult<LlmStreamChunk> {
    let response: OllamaResponse = serde_json::from_str(line)
        .map_err(|e| AppError::ServiceUnavailable(format!("Failed to parse chunk: {}", e)))?;

    let usage = response.done.then(|| {
        LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        )
    });

    Ok(LlmStreamChunk {
        content: response.response,
        done: response.done,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::with_base_url("http://gpu-box:11434/", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_sampling_options_nested() {
        let client = OllamaClient::new().unwrap();
        let request = LlmRequest::new("Hello", "llama3")
            .with_temperature(0.7)
            .with_max_tokens(100);

        let body = serde_json::to_value(client.to_ollama_request(&request, false)).unwrap();
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["prompt"], "Hello");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 100);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_options_omitted_when_unset() {
        let client = OllamaClient::new().unwrap();
        let body =
            serde_json::to_value(client.to_ollama_request(&LlmRequest::new("Hi", "llama3"), true))
                .unwrap();
        assert!(body.get("options").is_none());
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_parse_final_stream_line() {
        let chunk = parse_stream_line(
            r#"{"model":"llama3","response":"","done":true,"prompt_eval_count":12,"eval_count":30}"#,
        )
        .unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.usage.unwrap().total_tokens, 42);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_service_unavailable() {
        // Port 9 (discard) is closed on test machines
        let client =
            OllamaClient::with_base_url("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result = client.complete(&LlmRequest::new("Hi", "llama3")).await;
        assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    }
}
