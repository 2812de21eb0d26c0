//! Query command handler.

use clap::{Args, ValueEnum};
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::{DocumentType, KnowledgeService, Query};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TypeArg {
    Pdf,
    Csv,
}

impl From<TypeArg> for DocumentType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Pdf => DocumentType::Pdf,
            TypeArg::Csv => DocumentType::Csv,
        }
    }
}

/// Ask a question about an uploaded document
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// The id returned by the upload
    pub unique_id: String,

    /// The question
    pub query: String,

    /// Type of the uploaded document
    #[arg(short = 't', long = "type", value_enum, default_value = "pdf")]
    pub document_type: TypeArg,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    /// Execute the query command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command");
        tracing::debug!("Query command options: {:?}", self);

        let service = KnowledgeService::from_config(config)?;
        let query = Query {
            text: self.query.clone(),
            document_id: self.unique_id.clone(),
            document_type: self.document_type.into(),
        };

        let answer = service.answer(&query).await?;

        if self.json {
            return super::print_json(&answer);
        }

        println!("{}", answer.answer);

        if let Some(sources) = answer.sources {
            if !sources.is_empty() {
                println!();
                println!("Sources:");
                for (i, source) in sources.iter().enumerate() {
                    let preview: String = source.page_content.chars().take(120).collect();
                    println!("  [{}] {}: {}", i + 1, source.source, preview.replace('\n', " "));
                }
            }
        }

        Ok(())
    }
}
