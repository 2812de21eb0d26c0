//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use docqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Render a prompt definition with the given variables.
///
/// Every variable listed in `required_variables` must be present; an empty
/// value is allowed.
///
/// # Example
/// ```no_run
/// use docqa_prompt::{build_prompt, builtin_prompt, RAG_ANSWER};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(RAG_ANSWER).unwrap();
/// let mut vars = HashMap::new();
/// vars.insert("input".to_string(), "What is Rust?".to_string());
/// vars.insert("context".to_string(), "Rust is a language.".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("{}", built.text);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    if let Some(missing) = definition
        .required_variables
        .iter()
        .find(|name| !variables.contains_key(*name))
    {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' requires variable '{}'",
            definition.id, missing
        )));
    }

    let text = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        text,
        source_prompt_id: definition.id.clone(),
        resolved_variables: variables,
    })
}

fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{builtin_prompt, RAG_ANSWER, TABLE_ANSWER};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_rag_prompt_layout() {
        let def = builtin_prompt(RAG_ANSWER).unwrap();
        let built = build_prompt(
            &def,
            vars(&[
                ("input", "What is the capital of France?"),
                ("context", "The capital of France is Paris."),
            ]),
        )
        .unwrap();

        assert!(built.text.starts_with("<s>[INST] You are a technical assistant"));
        assert!(built
            .text
            .contains("say so. [/INST] </s> What is the capital of France? Context: The capital of France is Paris. Answer:"));
        assert_eq!(built.source_prompt_id, RAG_ANSWER);
    }

    #[test]
    fn test_no_html_escaping() {
        let def = builtin_prompt(RAG_ANSWER).unwrap();
        let built = build_prompt(
            &def,
            vars(&[("input", "Is 3 < 5 & 7 > 2?"), ("context", "a \"quoted\" <tag>")]),
        )
        .unwrap();
        assert!(built.text.contains("Is 3 < 5 & 7 > 2?"));
        assert!(built.text.contains("a \"quoted\" <tag>"));
    }

    #[test]
    fn test_missing_required_variable() {
        let def = builtin_prompt(TABLE_ANSWER).unwrap();
        let result = build_prompt(&def, vars(&[("input", "How many rows?")]));
        match result {
            Err(AppError::Prompt(msg)) => assert!(msg.contains("requires variable")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_template() {
        let def = PromptDefinition {
            id: "broken".to_string(),
            title: "Broken".to_string(),
            api_version: "v1".to_string(),
            required_variables: vec![],
            template: "{{#if}}".to_string(),
        };
        assert!(build_prompt(&def, HashMap::new()).is_err());
    }
}
