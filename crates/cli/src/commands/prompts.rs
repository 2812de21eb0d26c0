//! Prompts command handler.

use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_prompt::{builtin_ids, list_prompts, load_prompt};

/// List prompt templates
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Print the template of this prompt id instead of listing
    #[arg(long)]
    pub show: Option<String>,
}

impl PromptsCommand {
    /// Execute the prompts command.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let prompts_dir = config.prompts_dir();

        if let Some(ref id) = self.show {
            let prompt = load_prompt(&prompts_dir, id)?;
            println!("# {} ({})", prompt.title, prompt.id);
            println!("{}", prompt.template);
            return Ok(());
        }

        let overrides = list_prompts(&prompts_dir)?;
        tracing::debug!("Found {} prompt overrides in {:?}", overrides.len(), prompts_dir);

        for id in builtin_ids() {
            let origin = if overrides.iter().any(|o| o == id) {
                "override"
            } else {
                "built-in"
            };
            println!("{:<16} {}", id, origin);
        }

        for id in overrides
            .iter()
            .filter(|o| builtin_ids().iter().all(|b| *b != o.as_str()))
        {
            println!("{:<16} unused", id);
        }

        Ok(())
    }
}
