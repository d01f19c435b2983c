//! Errors raised while talking to a topic provider.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("no API key configured for {0}")]
    MissingApiKey(String),

    #[error("no endpoint configured for {0}")]
    MissingEndpoint(String),

    #[error("unexpected response body: {0}")]
    InvalidResponse(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Rate limits, server errors, timeouts and transport failures are worth
    /// another attempt; everything else fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { code, .. } => *code == 429 || (500..600).contains(code),
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::MissingApiKey(_)
            | Self::MissingEndpoint(_)
            | Self::InvalidResponse(_)
            | Self::Cancelled => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
