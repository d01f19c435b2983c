//! Provider kind enumeration and per-provider defaults.
//!
//! Defines [`ProviderKind`] which identifies which LLM backend to use, and
//! the default model and endpoint for each.

use anyhow::{anyhow, Result};

use crate::constants::{
    ANTHROPIC_DEFAULT_BASE_URL, DEFAULT_ANTHROPIC_MODEL, DEFAULT_MOONSHOT_MODEL,
    DEFAULT_OPENAI_MODEL, DEFAULT_OPENROUTER_MODEL, MOONSHOT_DEFAULT_BASE_URL,
    OLLAMA_DEFAULT_BASE_URL, OLLAMA_DEFAULT_MODEL, OPENAI_DEFAULT_BASE_URL,
    OPENROUTER_DEFAULT_BASE_URL,
};

/// Identifies which LLM provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Anthropic (Claude models, Messages API).
    Anthropic,
    /// OpenAI (GPT models, chat completions).
    OpenAI,
    /// Moonshot (Kimi models, OpenAI-compatible).
    Moonshot,
    /// OpenRouter (multi-provider gateway).
    OpenRouter,
    /// Ollama (local models via OpenAI-compatible API).
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        Self::Anthropic,
        Self::OpenAI,
        Self::Moonshot,
        Self::OpenRouter,
        Self::Ollama,
    ];

    /// Parses a provider name string into a [`ProviderKind`].
    ///
    /// Matching is case-insensitive; `kimi` is accepted for Moonshot and
    /// `claude` for Anthropic. Returns an error for unknown providers.
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            "moonshot" | "kimi" => Ok(Self::Moonshot),
            "openrouter" => Ok(Self::OpenRouter),
            "ollama" | "local" => Ok(Self::Ollama),
            other => Err(anyhow!(
                "Unknown provider: {other}. \
                 Supported: anthropic, openai, moonshot, openrouter, ollama"
            )),
        }
    }

    /// Config section and environment-variable prefix for this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAI => "openai",
            Self::Moonshot => "moonshot",
            Self::OpenRouter => "openrouter",
            Self::Ollama => "ollama",
        }
    }

    /// Ollama runs locally without authentication.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Base URL of the versioned API, used when the config has none.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => ANTHROPIC_DEFAULT_BASE_URL,
            Self::OpenAI => OPENAI_DEFAULT_BASE_URL,
            Self::Moonshot => MOONSHOT_DEFAULT_BASE_URL,
            Self::OpenRouter => OPENROUTER_DEFAULT_BASE_URL,
            Self::Ollama => OLLAMA_DEFAULT_BASE_URL,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the default model identifier for a given provider.
pub fn default_model_for(provider: &ProviderKind) -> &'static str {
    match provider {
        ProviderKind::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        ProviderKind::OpenAI => DEFAULT_OPENAI_MODEL,
        ProviderKind::Moonshot => DEFAULT_MOONSHOT_MODEL,
        ProviderKind::OpenRouter => DEFAULT_OPENROUTER_MODEL,
        ProviderKind::Ollama => OLLAMA_DEFAULT_MODEL,
    }
}
