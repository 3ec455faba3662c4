//! Per-outcome counters for completion calls.
//!
//! Every message ends in exactly one outcome: a provider answer, or a fallback
//! caused by one specific provider failure. Counters are lock-free and
//! reported on `/status`.

use deskmate_core::error::ProviderError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct OutcomeMetrics {
    provider_answers: AtomicU64,
    not_configured: AtomicU64,
    invalid_credential_format: AtomicU64,
    unauthorized: AtomicU64,
    rate_limited: AtomicU64,
    provider_error: AtomicU64,
    malformed_response: AtomicU64,
    timeout: AtomicU64,
    network: AtomicU64,
}

/// Point-in-time copy of [`OutcomeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeSnapshot {
    pub provider_answers: u64,
    pub fallbacks: FallbackCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackCounts {
    pub not_configured: u64,
    pub invalid_credential_format: u64,
    pub unauthorized: u64,
    pub rate_limited: u64,
    pub provider_error: u64,
    pub malformed_response: u64,
    pub timeout: u64,
    pub network: u64,
}

impl FallbackCounts {
    pub fn total(&self) -> u64 {
        self.not_configured
            + self.invalid_credential_format
            + self.unauthorized
            + self.rate_limited
            + self.provider_error
            + self.malformed_response
            + self.timeout
            + self.network
    }
}

impl OutcomeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_answer(&self) {
        self.provider_answers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, error: &ProviderError) {
        let counter = match error {
            ProviderError::NotConfigured(_) => &self.not_configured,
            ProviderError::InvalidCredentialFormat(_) => &self.invalid_credential_format,
            ProviderError::Unauthorized(_) => &self.unauthorized,
            ProviderError::RateLimited { .. } => &self.rate_limited,
            ProviderError::Api { .. } => &self.provider_error,
            ProviderError::MalformedResponse(_) => &self.malformed_response,
            ProviderError::Timeout(_) => &self.timeout,
            ProviderError::Network(_) => &self.network,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> OutcomeSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        OutcomeSnapshot {
            provider_answers: get(&self.provider_answers),
            fallbacks: FallbackCounts {
                not_configured: get(&self.not_configured),
                invalid_credential_format: get(&self.invalid_credential_format),
                unauthorized: get(&self.unauthorized),
                rate_limited: get(&self.rate_limited),
                provider_error: get(&self.provider_error),
                malformed_response: get(&self.malformed_response),
                timeout: get(&self.timeout),
                network: get(&self.network),
            },
        }
    }
}
