//! The `xiaoqiao list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use xiaoqiao_providers::config::load_config_from;
use xiaoqiao_providers::{create_provider, select_provider};

pub fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let active = select_provider(&config).map(|(name, _)| name.to_string());

    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();

    let mut found_any = false;

    for name in names {
        if provider_filter.as_ref().is_some_and(|filter| filter != name) {
            continue;
        }
        let provider_config = &config.providers[name];
        if !provider_config.has_credentials() {
            println!("Provider: {name} (no credentials, skipped)\n");
            continue;
        }

        let provider = create_provider(name, provider_config)?;
        let models = provider.available_models();
        if models.is_empty() {
            continue;
        }

        found_any = true;
        let marker = if active.as_deref() == Some(name.as_str()) {
            format!(" (active, model {})", config.model_for(name, provider_config))
        } else {
            String::new()
        };
        println!("Provider: {name}{marker}");
        for model in &models {
            println!(
                "  {} — {} ({}K context, ${:.4}/{:.4} per 1K tokens)",
                model.id,
                model.name,
                model.max_context / 1000,
                model.cost_per_1k_input,
                model.cost_per_1k_output,
            );
        }
        println!();
    }

    if !found_any {
        println!(
            "No providers configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY, \
             or run `xiaoqiao init` to create a config file."
        );
    }

    Ok(())
}
