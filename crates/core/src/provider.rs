//! Provider trait: the abstraction over the completion backend.
//!
//! A provider turns a system instruction plus a user prompt into answer text
//! with exactly one outbound call. It never retries; the orchestrator decides
//! what to do with a failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;

/// A single completion call: one system message, one user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Assistant persona and ground rules.
    pub system_instruction: String,

    /// The composed prompt (knowledge context + customer question).
    pub user_prompt: String,
}

impl CompletionRequest {
    pub fn new(system_instruction: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

/// A successful completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Answer text taken from the first choice.
    pub content: String,

    /// Which model actually responded.
    pub model: String,

    /// Token usage statistics, when the provider reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Static view of the configured credential, checked without a network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Configured,
    InvalidFormat,
    NotConfigured,
}

/// The core completion provider trait.
///
/// The orchestrator calls `complete()` without knowing which backend is in use,
/// so tests substitute scripted providers freely.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "groq").
    fn name(&self) -> &str;

    /// Send one request and return the answer text.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError>;

    /// Report whether a usable credential is present.
    fn credential_status(&self) -> CredentialStatus {
        CredentialStatus::Configured
    }
}
