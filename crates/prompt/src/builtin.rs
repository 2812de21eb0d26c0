//! Prompts compiled into the binary.
//!
//! Each can be replaced at deploy time by a YAML file with the same id in the
//! prompts directory.

use crate::types::PromptDefinition;

/// Grounded answer over retrieved document chunks.
pub const RAG_ANSWER: &str = "rag.answer";

/// Answer over a whole CSV table.
pub const TABLE_ANSWER: &str = "table.answer";

const RAG_ANSWER_TEMPLATE: &str = "<s>[INST] You are a technical assistant good at searching documents. If you do not have an answer from the provided information say so. [/INST] </s> {{input}} Context: {{context}} Answer:";

const TABLE_ANSWER_TEMPLATE: &str = "You are a data analyst answering questions about a single table.
Answer using only the table below. If the table cannot answer the question, say so.
When the answer is a number, state the number first.

Column summary:
{{summary}}

Table ({{row_count}} rows, CSV):
{{table}}

Question: {{input}}
Answer:";

/// Ids of every built-in prompt.
pub fn builtin_ids() -> Vec<&'static str> {
    vec![RAG_ANSWER, TABLE_ANSWER]
}

/// Look up a built-in prompt by id.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    let (title, template, required) = match id {
        RAG_ANSWER => (
            "Document question answering",
            RAG_ANSWER_TEMPLATE,
            vec!["input", "context"],
        ),
        TABLE_ANSWER => (
            "Table question answering",
            TABLE_ANSWER_TEMPLATE,
            vec!["input", "table", "summary", "row_count"],
        ),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "v1".to_string(),
        required_variables: required.into_iter().map(String::from).collect(),
        template: template.to_string(),
    })
}
