//! Topic provider abstraction for threadmap.
//!
//! The analysis pipeline only sees the [`TopicProvider`] trait: one prompt in,
//! raw model text out. [`HttpProvider`] implements it for the hosted and local
//! backends named by [`ProviderKind`], and [`invoke_with_retry`] wraps any
//! implementation with timeouts, retries and cancellation.

mod client;
mod error;
mod kind;
mod listing;
mod resolve;
mod retry;

use async_trait::async_trait;

pub use client::{HttpProvider, RequestSettings};
pub use error::ProviderError;
pub use kind::ProviderKind;
pub use listing::list_providers;
pub use resolve::{resolve_model, ModelSelection};
pub use retry::{invoke_with_retry, RetryPolicy};

/// A backend that turns a system/user prompt pair into raw model text.
#[async_trait]
pub trait TopicProvider: Send + Sync {
    async fn invoke(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}
