//! Struct definitions for threadmap configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for threadmap, deserialized from `config.toml`.
///
/// Every field is optional so threadmap runs with built-in defaults when no
/// config file exists; the accessors in `resolve.rs` fill the gaps.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Model identifier used when the provider section names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Default provider name (e.g., "moonshot", "anthropic").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
    /// Per-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Dialogue budget used to pick none, compress or segment.
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Retry and timeout policy for provider calls.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Generation parameters.
    #[serde(default)]
    pub request: RequestConfig,
}

/// Provider-specific configuration map.
///
/// Each field corresponds to a supported provider. Only providers the user
/// has configured will be `Some`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<ProviderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<ProviderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moonshot: Option<ProviderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter: Option<ProviderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama: Option<ProviderEntry>,
}

/// Connection details for a single provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProviderEntry {
    /// API key for authentication. Environment variables take precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom base URL (proxies, self-hosted gateways).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model identifier for this provider, overriding the top-level `model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BudgetConfig {
    /// Token budget for the dialogue part of the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_budget: Option<usize>,
    /// Conservative characters-per-token ratio for mixed CJK/Latin text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chars_per_token: Option<f64>,
    /// Fraction of the character budget the compressor may fill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct RetryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct RequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}
