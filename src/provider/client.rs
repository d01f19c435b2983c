//! HTTP client for the supported topic providers.
//!
//! OpenAI, Moonshot, OpenRouter and Ollama speak the OpenAI chat completions
//! protocol; Anthropic uses its Messages API. Both are plain JSON over
//! reqwest, so HTTP status codes reach the retry policy untouched.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ProviderError;
use super::kind::ProviderKind;
use super::resolve::ModelSelection;
use super::TopicProvider;
use crate::config::Config;
use crate::constants::{ANTHROPIC_VERSION, APP_NAME, MAX_OUTPUT_TOKENS_FLOOR};

/// Generation parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl RequestSettings {
    /// Topic JSON for long dialogues needs room; never ask for less than the floor.
    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens.max(MAX_OUTPUT_TOKENS_FLOOR)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: Option<String>,
}

/// A configured provider endpoint ready to answer topic prompts.
///
/// Configuration problems (no key, blank endpoint) are not reported here but
/// on the first [`TopicProvider::invoke`], so an unconfigured provider still
/// ends in the question navigator instead of aborting the command.
pub struct HttpProvider {
    http: reqwest::Client,
    kind: ProviderKind,
    model: String,
    base_url: String,
    headers: Option<HeaderMap>,
    settings: RequestSettings,
}

impl HttpProvider {
    /// Creates a new [`HttpProvider`] from the loaded application config.
    ///
    /// Resolves the API key through the config precedence chain
    /// (env var, config file, substitution) and the endpoint from the
    /// provider section or the built-in default.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key cannot be placed in a header or if
    /// the HTTP client fails to build.
    pub fn from_config(config: &Config, selection: &ModelSelection) -> Result<Self> {
        let kind = selection.provider;
        let api_key = config.resolve_api_key(kind);
        let headers = build_headers(kind, api_key.as_deref())
            .with_context(|| format!("Invalid API key for {kind}"))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("threadmap/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            kind,
            model: selection.model.clone(),
            base_url: config.base_url_for(kind),
            headers,
            settings: config.request_settings(),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn ready_headers(&self) -> Result<&HeaderMap, ProviderError> {
        if self.base_url.trim().is_empty() {
            return Err(ProviderError::MissingEndpoint(self.kind.to_string()));
        }
        self.headers
            .as_ref()
            .ok_or_else(|| ProviderError::MissingApiKey(self.kind.to_string()))
    }

    async fn chat_completion(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let headers = self.ready_headers()?;
        let path = match self.kind {
            ProviderKind::Ollama => "/v1/chat/completions",
            _ => "/chat/completions",
        };
        let req = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.settings.effective_max_tokens(),
            temperature: self.settings.temperature,
            stream: false,
        };

        let body: ChatCompletionResponse = self.post(path, headers, &req).await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("no message content in choices".into()))
    }

    async fn anthropic_messages(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let headers = self.ready_headers()?;
        let req = AnthropicRequest {
            model: &self.model,
            max_tokens: self.settings.effective_max_tokens(),
            temperature: self.settings.temperature,
            system,
            messages: vec![ChatMessage {
                role: "user",
                content: user,
            }],
        };

        let body: AnthropicResponse = self.post("/messages", headers, &req).await?;
        let text: String = body
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "no text block in content".into(),
            ));
        }
        Ok(text)
    }

    async fn post<B, R>(&self, path: &str, headers: &HeaderMap, req: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.url(path);
        debug!(provider = %self.kind, model = %self.model, %url, "sending topic request");

        let resp = self
            .http
            .post(&url)
            .headers(headers.clone())
            .json(req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|err| ProviderError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl TopicProvider for HttpProvider {
    async fn invoke(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        match self.kind {
            ProviderKind::Anthropic => self.anthropic_messages(system, user).await,
            _ => self.chat_completion(system, user).await,
        }
    }
}

/// Headers for authenticated requests, or `None` when a required key is absent.
fn build_headers(kind: ProviderKind, api_key: Option<&str>) -> Result<Option<HeaderMap>> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let key = api_key.map(str::trim).filter(|k| !k.is_empty());
    match (kind, key) {
        (ProviderKind::Anthropic, Some(key)) => {
            headers.insert("x-api-key", HeaderValue::from_str(key)?);
            headers.insert(
                "anthropic-version",
                HeaderValue::from_static(ANTHROPIC_VERSION),
            );
        }
        (ProviderKind::OpenRouter, Some(key)) => {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
            headers.insert("X-Title", HeaderValue::from_static(APP_NAME));
        }
        (_, Some(key)) => {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
        }
        (kind, None) if kind.requires_api_key() => return Ok(None),
        (_, None) => {}
    }
    Ok(Some(headers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_for(toml_src: &str, provider: ProviderKind) -> HttpProvider {
        let config: Config = toml::from_str(toml_src).unwrap();
        let selection = ModelSelection {
            provider,
            model: "test-model".into(),
        };
        HttpProvider::from_config(&config, &selection).unwrap()
    }

    #[test]
    fn test_max_tokens_has_a_floor() {
        let settings = RequestSettings {
            max_tokens: 1500,
            temperature: 0.3,
        };
        assert_eq!(settings.effective_max_tokens(), 2000);
        let generous = RequestSettings {
            max_tokens: 4096,
            ..settings
        };
        assert_eq!(generous.effective_max_tokens(), 4096);
    }

    #[test]
    fn test_anthropic_headers() {
        let headers = build_headers(ProviderKind::Anthropic, Some("sk-ant"))
            .unwrap()
            .unwrap();
        assert_eq!(headers["x-api-key"], "sk-ant");
        assert_eq!(headers["anthropic-version"], ANTHROPIC_VERSION);
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_bearer_headers() {
        let headers = build_headers(ProviderKind::Moonshot, Some("sk-moon"))
            .unwrap()
            .unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-moon");
    }

    #[test]
    fn test_missing_key_yields_no_headers() {
        assert!(build_headers(ProviderKind::OpenAI, None).unwrap().is_none());
        assert!(build_headers(ProviderKind::OpenAI, Some("  ")).unwrap().is_none());
        // ollama runs without a key
        assert!(build_headers(ProviderKind::Ollama, None).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unconfigured_key_fails_without_network() {
        let provider = provider_for(
            r#"
[provider.openai]
api_key = ""
"#,
            ProviderKind::OpenAI,
        );
        if provider.headers.is_some() {
            // OPENAI_API_KEY is set in this environment
            return;
        }
        let err = provider.invoke("system", "user").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey(_)));
    }

    #[tokio::test]
    async fn test_blank_endpoint_fails_without_network() {
        let provider = provider_for(
            r#"
[provider.ollama]
base_url = ""
"#,
            ProviderKind::Ollama,
        );
        let err = provider.invoke("system", "user").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingEndpoint(_)));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let provider = provider_for(
            r#"
[provider.ollama]
base_url = "http://localhost:11434/"
"#,
            ProviderKind::Ollama,
        );
        assert_eq!(
            provider.url("/v1/chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }
}
