//! Command handlers for the docqa CLI.

pub mod ask;
pub mod ingest;
pub mod prompts;
pub mod query;
pub mod serve;

pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use prompts::PromptsCommand;
pub use query::QueryCommand;
pub use serve::ServeCommand;

use docqa_core::{AppError, AppResult};
use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
