//! Error taxonomy for threadmap.
//!
//! Provider and response failures never reach the caller as errors: they
//! become a [`FallbackReason`] attached to the fallback topic list. The only
//! hard error of an analysis run is [`AnalysisError::AlreadyRunning`].

use thiserror::Error;

use crate::provider::ProviderError;

/// Why the question navigator was used instead of LLM topics.
///
/// The `Display` output is the short category shown to users; the detail is
/// kept for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackReason {
    /// Timeout, network failure, 5xx, or 429 after the last retry.
    #[error("provider unavailable")]
    ProviderUnavailable(String),
    /// 4xx other than 429, including auth failures.
    #[error("provider rejected")]
    ProviderRejected(String),
    /// No API key or endpoint for the selected provider.
    #[error("provider not configured")]
    NotConfigured(String),
    /// Unparseable answer, missing `nodes`, or no usable node.
    #[error("malformed response")]
    MalformedResponse(String),
    #[error("no user turns")]
    NoUserTurns,
    #[error("analysis cancelled")]
    Cancelled,
}

impl FallbackReason {
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::ProviderUnavailable(d)
            | Self::ProviderRejected(d)
            | Self::NotConfigured(d)
            | Self::MalformedResponse(d) => Some(d),
            Self::NoUserTurns | Self::Cancelled => None,
        }
    }
}

impl From<ProviderError> for FallbackReason {
    fn from(err: ProviderError) -> Self {
        let detail = err.to_string();
        match err {
            ProviderError::MissingApiKey(_) | ProviderError::MissingEndpoint(_) => {
                Self::NotConfigured(detail)
            }
            ProviderError::InvalidResponse(_) => Self::MalformedResponse(detail),
            ProviderError::Cancelled => Self::Cancelled,
            ref e if e.is_retryable() => Self::ProviderUnavailable(detail),
            _ => Self::ProviderRejected(detail),
        }
    }
}

/// Hard failures of [`crate::analysis::Analyzer::analyze`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// Another analysis is still outstanding; overlapping runs are rejected.
    #[error("an analysis is already in progress")]
    AlreadyRunning,
}
