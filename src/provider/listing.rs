//! Provider listing and discovery.
//!
//! Shows every supported provider with its effective model, endpoint and
//! key status, plus the models a local Ollama server has pulled.

use anyhow::Result;
use colored::Colorize;

use super::kind::ProviderKind;
use super::resolve::resolve_model;
use crate::config::Config;

/// List all providers, marking the one `analyze` would use by default.
pub async fn list_providers(config: &Config) -> Result<()> {
    let selection = resolve_model(None, None, config)?;

    println!("Providers:\n");
    for kind in ProviderKind::ALL {
        let marker = if kind == selection.provider {
            " (default)".green().to_string()
        } else {
            String::new()
        };
        let model = config
            .model_for(kind)
            .unwrap_or_else(|| super::kind::default_model_for(&kind).to_string());
        let key_status = if !kind.requires_api_key() {
            "no key needed".dimmed()
        } else if config.resolve_api_key(kind).is_some() {
            "key configured".green()
        } else {
            "no key".yellow()
        };

        println!("  {}{marker}", kind.name().bold());
        println!("    model:    {model}");
        println!("    endpoint: {}", config.base_url_for(kind));
        println!("    auth:     {key_status}");
    }

    println!("\n  {} models:", "ollama".bold());
    match list_ollama_models(config).await {
        Ok(models) if models.is_empty() => {
            println!("    (no models found -- run `ollama pull llama3`)");
        }
        Ok(models) => {
            for model in &models {
                println!("    {model}");
            }
        }
        Err(_) => {
            println!("    (ollama not running)");
        }
    }

    Ok(())
}

/// Query Ollama's local API for pulled models.
async fn list_ollama_models(config: &Config) -> Result<Vec<String>> {
    let base_url = config.base_url_for(ProviderKind::Ollama);
    let url = format!("{}/api/tags", base_url.trim_end_matches('/'));

    let resp: serde_json::Value = reqwest::get(&url).await?.json().await?;

    let models = resp["models"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    Ok(models)
}
