//! Chat orchestrator: one incoming message in, one persisted exchange out.
//!
//! # Flow
//!
//! 1. Validate session id and message
//! 2. Load the knowledge corpus and assemble context
//! 3. Call the completion provider with the composed prompt
//! 4. On any provider failure, take a fallback answer instead
//! 5. Append the exchange to the session (`SessionNotFound` if it is missing)
//! 6. Return the answer
//!
//! Steps 2 through 5 run under the session's lock.

use std::sync::Arc;

use deskmate_core::error::{Error, ProviderError, Result, StoreError};
use deskmate_core::knowledge::KnowledgeStore;
use deskmate_core::provider::{CompletionProvider, CompletionRequest};
use deskmate_core::session::SessionStore;
use deskmate_providers::FallbackResponder;
use tracing::{debug, error, info, warn};

use crate::context::ContextAssembler;
use crate::metrics::{OutcomeMetrics, OutcomeSnapshot};
use crate::prompt::{SYSTEM_INSTRUCTION, compose_user_prompt};
use crate::session_locks::SessionLocks;

/// Where an answer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSource {
    Provider { model: String },
    /// `reason` is the [`ProviderError::kind`] that triggered the fallback.
    Fallback { reason: &'static str },
}

impl AnswerSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Result of handling one message.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
    pub source: AnswerSource,
}

pub struct ChatOrchestrator {
    knowledge: Arc<dyn KnowledgeStore>,
    sessions: Arc<dyn SessionStore>,
    provider: Arc<dyn CompletionProvider>,
    fallback: FallbackResponder,
    assembler: ContextAssembler,
    locks: SessionLocks,
    metrics: OutcomeMetrics,
}

impl ChatOrchestrator {
    pub fn new(
        knowledge: Arc<dyn KnowledgeStore>,
        sessions: Arc<dyn SessionStore>,
        provider: Arc<dyn CompletionProvider>,
        fallback: FallbackResponder,
    ) -> Self {
        Self {
            knowledge,
            sessions,
            provider,
            fallback,
            assembler: ContextAssembler::default(),
            locks: SessionLocks::new(),
            metrics: OutcomeMetrics::new(),
        }
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn provider(&self) -> &Arc<dyn CompletionProvider> {
        &self.provider
    }

    pub fn assembler(&self) -> &ContextAssembler {
        &self.assembler
    }

    pub fn metrics(&self) -> OutcomeSnapshot {
        self.metrics.snapshot()
    }

    /// Answer `message` in `session_id` and record the exchange.
    ///
    /// Provider failures never surface here; they become fallback answers.
    pub async fn handle_message(&self, session_id: &str, message: &str) -> Result<ChatReply> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(Error::InvalidRequest("sessionId is required".into()));
        }
        if message.is_empty() {
            return Err(Error::InvalidRequest("message is required".into()));
        }

        let _guard = self.locks.acquire(session_id).await;

        let documents = self.knowledge.list_all().await?;
        let context = self.assembler.assemble(&documents);
        debug!(
            session_id,
            strategy = self.assembler.strategy_name(),
            included = context.included,
            dropped = context.dropped(),
            chars = context.text.len(),
            "Assembled knowledge context"
        );

        let request =
            CompletionRequest::new(SYSTEM_INSTRUCTION, compose_user_prompt(&context.text, message));

        let (response, source) = match self.provider.complete(request).await {
            Ok(completion) => {
                self.metrics.record_answer();
                info!(
                    session_id,
                    provider = self.provider.name(),
                    model = %completion.model,
                    tokens = completion.usage.as_ref().map(|u| u.total_tokens),
                    "Provider answered"
                );
                (
                    completion.content,
                    AnswerSource::Provider {
                        model: completion.model,
                    },
                )
            }
            Err(e) => {
                self.record_provider_failure(session_id, &e);
                (
                    self.fallback.respond(message),
                    AnswerSource::Fallback { reason: e.kind() },
                )
            }
        };

        self.sessions
            .append_exchange(session_id, message, &response)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => Error::SessionNotFound(session_id.to_string()),
                other => Error::Store(other),
            })?;

        Ok(ChatReply {
            response,
            session_id: session_id.to_string(),
            source,
        })
    }

    fn record_provider_failure(&self, session_id: &str, e: &ProviderError) {
        self.metrics.record_failure(e);
        let provider = self.provider.name();
        if e.is_credential_problem() {
            error!(session_id, provider, kind = e.kind(), error = %e, "Provider credential problem; using fallback answer");
        } else if e.is_retryable() {
            warn!(session_id, provider, kind = e.kind(), error = %e, "Provider temporarily unavailable; using fallback answer");
        } else {
            error!(session_id, provider, kind = e.kind(), error = %e, "Provider call failed; using fallback answer");
        }
    }
}
