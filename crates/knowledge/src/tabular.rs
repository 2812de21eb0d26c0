//! CSV tables and the agent that answers questions about them.
//!
//! The whole table is handed to a [`TableAgent`] together with the verbatim
//! question. The shipped [`LlmTableAgent`] renders the table and a numeric
//! column summary into a prompt and makes one model call.

use async_trait::async_trait;
use docqa_core::{AppError, AppResult};
use docqa_llm::{LlmClient, LlmRequest};
use docqa_prompt::{build_prompt, PromptDefinition};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A validated, rectangular CSV table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// The CSV text as uploaded
    pub raw: String,
}

/// Aggregates over one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Table {
    /// Parse and validate CSV bytes.
    ///
    /// The text must be UTF-8 with a non-empty header row, and every record
    /// must have as many fields as the header.
    pub fn parse(bytes: &[u8]) -> AppResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| AppError::BadRequest("CSV file is not valid UTF-8".to_string()))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::BadRequest(format!("Invalid CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(AppError::BadRequest("CSV file has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| AppError::BadRequest(format!("Invalid CSV: {}", e)))?;
            rows.push(record.iter().map(|field| field.trim().to_string()).collect());
        }

        Ok(Self {
            headers,
            rows,
            raw: text.to_string(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Summaries for every column whose non-empty cells all parse as numbers.
    pub fn summary(&self) -> Vec<ColumnSummary> {
        let mut summaries = Vec::new();

        for (index, name) in self.headers.iter().enumerate() {
            let cells: Vec<&str> = self
                .rows
                .iter()
                .filter_map(|row| row.get(index))
                .map(String::as_str)
                .filter(|cell| !cell.is_empty())
                .collect();

            let values: Option<Vec<f64>> = cells.iter().map(|c| c.parse::<f64>().ok()).collect();
            let values = match values {
                Some(values) if !values.is_empty() => values,
                _ => continue,
            };

            let count = values.len();
            let sum: f64 = values.iter().sum();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            summaries.push(ColumnSummary {
                name: name.clone(),
                count,
                mean: sum / count as f64,
                min,
                max,
            });
        }

        summaries
    }

    /// Render [`Table::summary`] as one line per numeric column.
    pub fn render_summary(&self) -> String {
        let summaries = self.summary();
        if summaries.is_empty() {
            return "No numeric columns.".to_string();
        }

        summaries
            .iter()
            .map(|s| {
                format!(
                    "- {}: count {}, mean {}, min {}, max {}",
                    s.name,
                    s.count,
                    fmt_number(s.mean),
                    fmt_number(s.min),
                    fmt_number(s.max)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Format without trailing zeros: `30`, `27.5`, `0.3333`.
pub fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{:.0}", value);
    }
    let formatted = format!("{:.4}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Answers a question over a whole table.
#[async_trait]
pub trait TableAgent: Send + Sync {
    async fn answer(&self, table: &Table, query: &str) -> AppResult<String>;
}

/// Table agent backed by a single LLM completion.
pub struct LlmTableAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    prompt: PromptDefinition,
}

impl LlmTableAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        temperature: f32,
        prompt: PromptDefinition,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature,
            prompt,
        }
    }
}

#[async_trait]
impl TableAgent for LlmTableAgent {
    async fn answer(&self, table: &Table, query: &str) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("input".to_string(), query.to_string());
        variables.insert("table".to_string(), table.raw.trim_end().to_string());
        variables.insert("summary".to_string(), table.render_summary());
        variables.insert("row_count".to_string(), table.row_count().to_string());

        let built = build_prompt(&self.prompt, variables)?;

        tracing::debug!(
            "Asking table agent ({} rows, {} columns)",
            table.row_count(),
            table.headers.len()
        );

        let request = LlmRequest::new(built.text, self.model.clone()).with_temperature(self.temperature);
        let response = self.llm.complete(&request).await?;

        Ok(response.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{EchoLlm, FailingLlm};
    use docqa_prompt::{builtin_prompt, TABLE_ANSWER};

    #[test]
    fn test_parse_table() {
        let table = Table::parse(b"name,age\nalice,25\nbob,35\n").unwrap();
        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[1], vec!["bob", "35"]);
    }

    #[test]
    fn test_parse_strips_bom() {
        let table = Table::parse("\u{feff}name,age\nalice,25\n".as_bytes()).unwrap();
        assert_eq!(table.headers[0], "name");
    }

    #[test]
    fn test_parse_rejects_invalid_input() {
        for bytes in [
            &b""[..],
            &b"\xff\xfe\x00garbage"[..],
            &b"name,age\nalice,25,extra\n"[..],
            &b",\n1,2\n"[..],
        ] {
            assert!(
                matches!(Table::parse(bytes), Err(AppError::BadRequest(_))),
                "accepted {:?}",
                bytes
            );
        }
    }

    #[test]
    fn test_header_only_table_is_valid() {
        let table = Table::parse(b"name,age\n").unwrap();
        assert_eq!(table.row_count(), 0);
        assert!(table.summary().is_empty());
    }

    #[test]
    fn test_summary_of_numeric_columns() {
        let table = Table::parse(b"name,age,score\nalice,25,1.5\nbob,35,\ncarol,30,2\n").unwrap();
        let summary = table.summary();

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].name, "age");
        assert_eq!(summary[0].count, 3);
        assert_eq!(summary[0].mean, 30.0);
        assert_eq!(summary[0].min, 25.0);
        assert_eq!(summary[0].max, 35.0);
        assert_eq!(summary[1].name, "score");
        assert_eq!(summary[1].count, 2);
        assert_eq!(summary[1].mean, 1.75);
    }

    #[test]
    fn test_render_summary() {
        let table = Table::parse(b"name,age\nalice,25\nbob,35\n").unwrap();
        assert_eq!(
            table.render_summary(),
            "- age: count 2, mean 30, min 25, max 35"
        );

        let text_only = Table::parse(b"name\nalice\n").unwrap();
        assert_eq!(text_only.render_summary(), "No numeric columns.");
    }

    #[test]
    fn test_fmt_number() {
        assert_eq!(fmt_number(30.0), "30");
        assert_eq!(fmt_number(27.5), "27.5");
        assert_eq!(fmt_number(1.0 / 3.0), "0.3333");
        assert_eq!(fmt_number(-4.0), "-4");
    }

    #[tokio::test]
    async fn test_llm_agent_prompt_carries_table_and_summary() {
        let agent = LlmTableAgent::new(
            Arc::new(EchoLlm),
            "test-model",
            0.0,
            builtin_prompt(TABLE_ANSWER).unwrap(),
        );
        let table = Table::parse(b"name,age\nalice,25\nbob,35\n").unwrap();

        let answer = agent.answer(&table, "What is the average age?").await.unwrap();

        assert!(answer.contains("mean 30"));
        assert!(answer.contains("alice,25"));
        assert!(answer.contains("What is the average age?"));
        assert!(answer.contains("2 rows"));
    }

    #[tokio::test]
    async fn test_llm_agent_failure_propagates() {
        let agent = LlmTableAgent::new(
            Arc::new(FailingLlm),
            "test-model",
            0.0,
            builtin_prompt(TABLE_ANSWER).unwrap(),
        );
        let table = Table::parse(b"name,age\nalice,25\n").unwrap();

        let result = agent.answer(&table, "average?").await;
        assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    }
}
