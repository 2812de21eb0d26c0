//! Prompt loader.
//!
//! Resolves prompt ids against YAML overrides in a prompts directory,
//! falling back to the built-in definitions.

use crate::builtin::builtin_prompt;
use crate::types::PromptDefinition;
use docqa_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition by id.
///
/// `<prompts_dir>/<id>.yml` wins over the built-in prompt with the same id.
///
/// # Example
/// ```no_run
/// use docqa_prompt::{load_prompt, RAG_ANSWER};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("data/prompts"), RAG_ANSWER)?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(prompts_dir: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        return builtin_prompt(prompt_id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)));
    }

    tracing::debug!("Loading prompt override from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition, prompt_id)?;

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List the prompt ids overridden in `prompts_dir`, sorted.
pub fn list_prompts(prompts_dir: &Path) -> AppResult<Vec<String>> {
    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

fn validate_prompt(def: &PromptDefinition, expected_id: &str) -> AppResult<()> {
    if def.id != expected_id {
        return Err(AppError::Prompt(format!(
            "Prompt file for '{}' declares id '{}'",
            expected_id, def.id
        )));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.api_version.is_empty() {
        return Err(AppError::Prompt(
            "Prompt apiVersion cannot be empty".to_string(),
        ));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::RAG_ANSWER;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, template: &str) {
        let content = format!(
            "id: {}\ntitle: Custom\napiVersion: v1\nrequiredVariables: [input, context]\ntemplate: \"{}\"\n",
            id, template
        );
        fs::write(dir.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), RAG_ANSWER).unwrap();
        assert_eq!(prompt.id, RAG_ANSWER);
        assert!(prompt.template.contains("technical assistant"));
    }

    #[test]
    fn test_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), RAG_ANSWER, "Q: {{input}} C: {{context}}");

        let prompt = load_prompt(temp_dir.path(), RAG_ANSWER).unwrap();
        assert_eq!(prompt.title, "Custom");
        assert_eq!(prompt.template, "Q: {{input}} C: {{context}}");
    }

    #[test]
    fn test_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("rag.answer.yml"), "invalid: yaml: content:").unwrap();
        assert!(load_prompt(temp_dir.path(), RAG_ANSWER).is_err());
    }

    #[test]
    fn test_mismatched_id_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "other", "{{input}}");
        fs::rename(
            temp_dir.path().join("other.yml"),
            temp_dir.path().join("rag.answer.yml"),
        )
        .unwrap();
        assert!(load_prompt(temp_dir.path(), RAG_ANSWER).is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "table.answer", "{{input}}");
        write_prompt(temp_dir.path(), "rag.answer", "{{input}}");
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec!["rag.answer".to_string(), "table.answer".to_string()]);
    }

    #[test]
    fn test_list_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_prompts(&temp_dir.path().join("absent")).unwrap().is_empty());
    }
}
