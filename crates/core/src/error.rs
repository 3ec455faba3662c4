//! Error types for the Deskmate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] wraps them all.

use thiserror::Error;

/// The top-level error type for all Deskmate operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A required request field is missing or blank.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The session referenced by a chat message does not exist.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Upload exceeds the configured size limit. Checked before extraction.
    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    // --- Bounded context errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures from the completion provider.
///
/// Every variant is recovered by the orchestrator with a fallback answer;
/// the distinct variants exist so each can be logged and counted separately.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid credential format: {0}")]
    InvalidCredentialFormat(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited by provider{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("API request failed with status {status_code}: {body}")]
    Api { status_code: u16, body: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),
}

fn retry_hint(secs: &Option<u64>) -> String {
    match secs {
        Some(s) => format!(", retry after {s}s"),
        None => String::new(),
    }
}

impl ProviderError {
    /// Stable snake_case label used in logs and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::InvalidCredentialFormat(_) => "invalid_credential_format",
            Self::Unauthorized(_) => "unauthorized",
            Self::RateLimited { .. } => "rate_limited",
            Self::Api { .. } => "provider_error",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network",
        }
    }

    /// Whether the same request could succeed if tried again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            Self::NotConfigured(_)
            | Self::InvalidCredentialFormat(_)
            | Self::Unauthorized(_)
            | Self::MalformedResponse(_) => false,
        }
    }

    /// Whether the failure points at the operator's credential setup.
    pub fn is_credential_problem(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured(_) | Self::InvalidCredentialFormat(_) | Self::Unauthorized(_)
        )
    }
}

/// Failures from the knowledge and session stores.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn knowledge_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Knowledge document",
            id: id.into(),
        }
    }

    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Session",
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failures turning an uploaded blob into plain text.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to extract {file_type} content: {reason}")]
    ExtractionFailed { file_type: String, reason: String },
}
