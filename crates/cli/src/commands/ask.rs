//! Ask command handler.
//!
//! Sends a question straight to the generation model, with no document
//! context. Streams by default.

use clap::Args;
use docqa_core::{config::AppConfig, AppError, AppResult};
use docqa_llm::{create_client, LlmClient, LlmRequest, LlmUsage};
use futures::StreamExt;
use std::io::Write;

/// Ask the model directly
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Maximum tokens in response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Temperature for response generation (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        if self.query.trim().is_empty() {
            return Err(AppError::BadRequest("Query must not be empty".to_string()));
        }

        let client = create_client(&config.llm)?;

        let mut request = LlmRequest::new(self.query.clone(), &config.llm.model)
            .with_temperature(self.temperature.unwrap_or(config.llm.temperature));
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        // JSON output needs the whole answer anyway.
        if self.no_stream || self.json {
            self.handle_non_streaming(client.as_ref(), &request, config)
                .await
        } else {
            self.handle_streaming(client.as_ref(), &request).await
        }
    }

    async fn handle_non_streaming(
        &self,
        client: &dyn LlmClient,
        request: &LlmRequest,
        config: &AppConfig,
    ) -> AppResult<()> {
        tracing::info!("Sending non-streaming request to LLM");

        let response = client.complete(request).await?;
        let answer = response.content.trim();

        if self.json {
            let output = serde_json::json!({
                "answer": answer,
                "model": response.model,
                "provider": config.llm.provider,
                "usage": {
                    "promptTokens": response.usage.prompt_tokens,
                    "completionTokens": response.usage.completion_tokens,
                    "totalTokens": response.usage.total_tokens
                }
            });
            super::print_json(&output)?;
        } else {
            println!("{}", answer);
            log_usage(&response.usage);
        }

        Ok(())
    }

    async fn handle_streaming(&self, client: &dyn LlmClient, request: &LlmRequest) -> AppResult<()> {
        tracing::info!("Starting streaming request to LLM");

        let mut stream = client.stream(request).await?;
        let mut stdout = std::io::stdout();
        let mut final_usage = None;

        while let Some(result) = stream.next().await {
            let chunk = result?;

            if !chunk.content.is_empty() {
                print!("{}", chunk.content);
                stdout.flush().ok();
            }

            if chunk.done {
                final_usage = chunk.usage;
                break;
            }
        }

        println!();

        if let Some(usage) = final_usage {
            log_usage(&usage);
        }

        Ok(())
    }
}

fn log_usage(usage: &LlmUsage) {
    tracing::debug!(
        "Token usage - Prompt: {}, Completion: {}, Total: {}",
        usage.prompt_tokens,
        usage.completion_tokens,
        usage.total_tokens
    );
}
