//! Prompt templates for docqa.
//!
//! - Built-in prompt definitions for document and table answers
//! - YAML overrides loaded from a prompts directory
//! - Handlebars rendering without HTML escaping

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use builtin::{builtin_ids, builtin_prompt, RAG_ANSWER, TABLE_ANSWER};
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, PromptDefinition};
