//! Environment variable substitution and resolved settings.

use std::time::Duration;

use super::types::{Config, ProviderEntry};
use crate::constants::{
    BUDGET_MARGIN_DEFAULT, CHARS_PER_TOKEN_DEFAULT, FIRST_ATTEMPT_TIMEOUT_SECS_DEFAULT,
    MAX_TOKENS_DEFAULT, RETRY_ATTEMPT_TIMEOUT_SECS_DEFAULT, RETRY_DELAY_MS_DEFAULT,
    RETRY_MAX_ATTEMPTS_DEFAULT, TEMPERATURE_DEFAULT, TOKEN_BUDGET_DEFAULT,
};
use crate::pipeline::BudgetSettings;
use crate::provider::{ProviderKind, RequestSettings, RetryPolicy};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        if let Some(ref mut m) = self.model {
            *m = Self::resolve_str(m);
        }
        if let Some(ref mut dp) = self.default_provider {
            *dp = Self::resolve_str(dp);
        }
        Self::resolve_provider_entry(&mut self.provider.openai);
        Self::resolve_provider_entry(&mut self.provider.anthropic);
        Self::resolve_provider_entry(&mut self.provider.moonshot);
        Self::resolve_provider_entry(&mut self.provider.openrouter);
        Self::resolve_provider_entry(&mut self.provider.ollama);
    }

    /// Resolves `{env:VAR}` patterns in a single provider entry.
    fn resolve_provider_entry(entry: &mut Option<ProviderEntry>) {
        if let Some(ref mut e) = entry {
            for field in [&mut e.api_key, &mut e.base_url, &mut e.model] {
                if let Some(value) = field {
                    *value = Self::resolve_str(value);
                }
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    /// Unset variables resolve to the empty string.
    pub(super) fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        let mut from = 0;
        while let Some(offset) = result[from..].find("{env:") {
            let start = from + offset;
            let Some(end) = result[start..].find('}') else {
                break;
            };
            let var_name = &result[start + 5..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
            // inserted values are not scanned again
            from = start + value.len();
        }
        result
    }

    fn entry(&self, kind: ProviderKind) -> Option<&ProviderEntry> {
        match kind {
            ProviderKind::OpenAI => self.provider.openai.as_ref(),
            ProviderKind::Anthropic => self.provider.anthropic.as_ref(),
            ProviderKind::Moonshot => self.provider.moonshot.as_ref(),
            ProviderKind::OpenRouter => self.provider.openrouter.as_ref(),
            ProviderKind::Ollama => self.provider.ollama.as_ref(),
        }
    }

    /// Resolve API key for a provider: env var first, then config value.
    /// Blank values count as missing.
    pub fn resolve_api_key(&self, kind: ProviderKind) -> Option<String> {
        // MOONSHOT_API_KEY, ANTHROPIC_API_KEY, etc.
        let env_key = format!("{}_API_KEY", kind.name().to_uppercase());
        if let Ok(val) = std::env::var(&env_key) {
            if !val.trim().is_empty() {
                return Some(val);
            }
        }

        self.entry(kind)
            .and_then(|e| e.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    /// Endpoint for a provider: the configured `base_url` (even when blank),
    /// otherwise the built-in default.
    pub fn base_url_for(&self, kind: ProviderKind) -> String {
        self.entry(kind)
            .and_then(|e| e.base_url.clone())
            .unwrap_or_else(|| kind.default_base_url().to_string())
    }

    /// Get the configured default provider name, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.default_provider.as_deref()
    }

    /// Configured model for a provider: its own section first, then the
    /// top-level `model`. A top-level `provider/model` value only applies to
    /// the provider it names.
    pub fn model_for(&self, kind: ProviderKind) -> Option<String> {
        if let Some(model) = self.entry(kind).and_then(|e| e.model.as_deref()) {
            if !model.trim().is_empty() {
                return Some(model.to_string());
            }
        }

        let model = self.model.as_deref().filter(|m| !m.trim().is_empty())?;
        match model.split_once('/') {
            Some((prefix, rest)) => match ProviderKind::from_str(prefix) {
                Ok(named) if named == kind => Some(rest.to_string()),
                Ok(_) => None,
                // not a provider prefix, e.g. an OpenRouter "org/model" id
                Err(_) => Some(model.to_string()),
            },
            None => Some(model.to_string()),
        }
    }

    /// Budget planner settings with defaults filled in.
    pub fn budget_settings(&self) -> BudgetSettings {
        BudgetSettings {
            token_budget: self.budget.token_budget.unwrap_or(TOKEN_BUDGET_DEFAULT),
            chars_per_token: self
                .budget
                .chars_per_token
                .filter(|ratio| *ratio > 0.0)
                .unwrap_or(CHARS_PER_TOKEN_DEFAULT),
            margin: self
                .budget
                .margin
                .filter(|margin| *margin > 0.0)
                .unwrap_or(BUDGET_MARGIN_DEFAULT),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self
                .retry
                .max_attempts
                .unwrap_or(RETRY_MAX_ATTEMPTS_DEFAULT)
                .max(1),
            delay: Duration::from_millis(self.retry.delay_ms.unwrap_or(RETRY_DELAY_MS_DEFAULT)),
            first_timeout: Duration::from_secs(
                self.retry
                    .first_timeout_secs
                    .unwrap_or(FIRST_ATTEMPT_TIMEOUT_SECS_DEFAULT),
            ),
            retry_timeout: Duration::from_secs(
                self.retry
                    .retry_timeout_secs
                    .unwrap_or(RETRY_ATTEMPT_TIMEOUT_SECS_DEFAULT),
            ),
        }
    }

    pub fn request_settings(&self) -> RequestSettings {
        RequestSettings {
            max_tokens: self.request.max_tokens.unwrap_or(MAX_TOKENS_DEFAULT),
            temperature: self.request.temperature.unwrap_or(TEMPERATURE_DEFAULT),
        }
    }

    /// Copy of the config with API keys shortened for display.
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        for entry in [
            &mut config.provider.openai,
            &mut config.provider.anthropic,
            &mut config.provider.moonshot,
            &mut config.provider.openrouter,
            &mut config.provider.ollama,
        ]
        .into_iter()
        .flatten()
        {
            if let Some(key) = entry.api_key.as_mut() {
                if !key.is_empty() {
                    let prefix: String = key.chars().take(4).collect();
                    *key = format!("{prefix}...");
                }
            }
        }
        config
    }
}
