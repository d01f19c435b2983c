//! File loading and merging for threadmap configuration.

use anyhow::{Context, Result};
use std::fs;

use super::types::{
    BudgetConfig, Config, ProviderConfig, ProviderEntry, RequestConfig, RetryConfig,
};
use crate::constants::{
    BUDGET_MARGIN_DEFAULT, CHARS_PER_TOKEN_DEFAULT, DEFAULT_PROVIDER, OLLAMA_DEFAULT_BASE_URL,
    TOKEN_BUDGET_DEFAULT,
};

impl Config {
    /// Loads the global config from `~/.config/threadmap/config.toml`.
    ///
    /// If no config file exists, creates one with sensible defaults
    /// (including `{env:VAR}` placeholders for API keys) and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = default_config_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            let config: Config = toml::from_str(&default_toml)
                .with_context(|| "Failed to parse default config".to_string())?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;
        Ok(config)
    }

    /// Look for threadmap.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                let contents = fs::read_to_string(&candidate)
                    .with_context(|| format!("Failed to read {:?}", candidate))?;
                let config: Config = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse {:?}", candidate))?;
                return Ok(Some(config));
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    /// Project values win field by field when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        Config {
            model: project.model.or(global.model),
            default_provider: project.default_provider.or(global.default_provider),
            provider: ProviderConfig {
                openai: merge_entry(global.provider.openai, project.provider.openai),
                anthropic: merge_entry(global.provider.anthropic, project.provider.anthropic),
                moonshot: merge_entry(global.provider.moonshot, project.provider.moonshot),
                openrouter: merge_entry(global.provider.openrouter, project.provider.openrouter),
                ollama: merge_entry(global.provider.ollama, project.provider.ollama),
            },
            budget: BudgetConfig {
                token_budget: project.budget.token_budget.or(global.budget.token_budget),
                chars_per_token: project
                    .budget
                    .chars_per_token
                    .or(global.budget.chars_per_token),
                margin: project.budget.margin.or(global.budget.margin),
            },
            retry: RetryConfig {
                max_attempts: project.retry.max_attempts.or(global.retry.max_attempts),
                delay_ms: project.retry.delay_ms.or(global.retry.delay_ms),
                first_timeout_secs: project
                    .retry
                    .first_timeout_secs
                    .or(global.retry.first_timeout_secs),
                retry_timeout_secs: project
                    .retry
                    .retry_timeout_secs
                    .or(global.retry.retry_timeout_secs),
            },
            request: RequestConfig {
                max_tokens: project.request.max_tokens.or(global.request.max_tokens),
                temperature: project.request.temperature.or(global.request.temperature),
            },
        }
    }
}

fn merge_entry(
    global: Option<ProviderEntry>,
    project: Option<ProviderEntry>,
) -> Option<ProviderEntry> {
    match (global, project) {
        (Some(g), Some(p)) => Some(ProviderEntry {
            api_key: p.api_key.or(g.api_key),
            base_url: p.base_url.or(g.base_url),
            model: p.model.or(g.model),
        }),
        (g, p) => p.or(g),
    }
}

/// Contents written to a fresh global config file.
fn default_config_toml() -> String {
    format!(
        r#"default_provider = "{DEFAULT_PROVIDER}"

[provider.moonshot]
api_key = "{{env:MOONSHOT_API_KEY}}"

[provider.anthropic]
api_key = "{{env:ANTHROPIC_API_KEY}}"

[provider.openai]
api_key = "{{env:OPENAI_API_KEY}}"

[provider.openrouter]
api_key = "{{env:OPENROUTER_API_KEY}}"

[provider.ollama]
base_url = "{OLLAMA_DEFAULT_BASE_URL}"

[budget]
token_budget = {TOKEN_BUDGET_DEFAULT}
chars_per_token = {CHARS_PER_TOKEN_DEFAULT:.1}
margin = {BUDGET_MARGIN_DEFAULT}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&default_config_toml()).unwrap();
        assert_eq!(config.default_provider.as_deref(), Some("moonshot"));
        assert_eq!(config.budget.token_budget, Some(6000));
        assert_eq!(config.budget.chars_per_token, Some(2.0));
        assert_eq!(config.budget.margin, Some(0.85));
        assert_eq!(
            config.provider.moonshot.unwrap().api_key.as_deref(),
            Some("{env:MOONSHOT_API_KEY}")
        );
    }

    #[test]
    fn test_merge_project_over_global() {
        let global: Config = toml::from_str(
            r#"
default_provider = "anthropic"

[provider.anthropic]
api_key = "global-key"
model = "claude-3-5-haiku-latest"

[budget]
token_budget = 8000
margin = 0.9
"#,
        )
        .unwrap();
        let project: Config = toml::from_str(
            r#"
[provider.anthropic]
model = "claude-3-opus"

[budget]
token_budget = 3000
"#,
        )
        .unwrap();

        let merged = Config::merge(global, project);
        assert_eq!(merged.default_provider.as_deref(), Some("anthropic"));
        let anthropic = merged.provider.anthropic.unwrap();
        assert_eq!(anthropic.api_key.as_deref(), Some("global-key"));
        assert_eq!(anthropic.model.as_deref(), Some("claude-3-opus"));
        assert_eq!(merged.budget.token_budget, Some(3000));
        assert_eq!(merged.budget.margin, Some(0.9));
    }

    #[test]
    fn test_merge_keeps_project_only_provider() {
        let project: Config = toml::from_str(
            r#"
[provider.ollama]
base_url = "http://gpu-box:11434"
"#,
        )
        .unwrap();
        let merged = Config::merge(Config::default(), project);
        assert_eq!(
            merged.provider.ollama.unwrap().base_url.as_deref(),
            Some("http://gpu-box:11434")
        );
    }
}
