#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Shared types and the transport-independent parts of the relay engine:
//! the credential pool, the completion dispatcher and the connection supervisor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod dispatch;
pub mod error;
pub mod pacer;
pub mod supervisor;

pub use dispatch::{CompletionDispatcher, Credential, CredentialPool, MAX_TOKENS, TEMPERATURE};
pub use error::{Error, Result, UpstreamError};
pub use pacer::{HumanPacer, NoDelay, Pacer};
pub use supervisor::{BackoffPolicy, Supervisor, SupervisorState, Transport};

/// Fallback personality used when no system prompt is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One chat-completion call as sent upstream.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Copy)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A client handle bound to a single upstream credential.
///
/// Implementations classify failures themselves: a usage-limit response maps
/// to [`UpstreamError::Quota`], everything else to [`UpstreamError::Other`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
    ) -> std::result::Result<LLMResponse, UpstreamError>;
}
