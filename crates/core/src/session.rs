//! Chat sessions: one user's conversation with an append-only exchange log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::StoreError;

/// User id recorded when the client does not supply one.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Lifecycle marker. Nothing in the pipeline transitions it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// One question/answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub user_message: String,
    pub ai_response: String,
    pub timestamp: DateTime<Utc>,
}

/// A conversation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,

    /// Chronological; only ever appended to.
    #[serde(default)]
    pub messages: Vec<Exchange>,

    #[serde(default)]
    pub status: SessionStatus,
}

impl Session {
    /// A fresh, empty, active session. Blank user ids become [`ANONYMOUS_USER`].
    pub fn new(user_id: Option<&str>) -> Self {
        let user_id = user_id
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(ANONYMOUS_USER);

        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            started_at: Utc::now(),
            messages: Vec::new(),
            status: SessionStatus::Active,
        }
    }
}

/// Durable store of chat sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    fn name(&self) -> &str;

    /// Create and persist a new empty session.
    async fn create(&self, user_id: Option<&str>) -> Result<Session, StoreError>;

    /// Fetch a session with its full message log, or `NotFound`.
    async fn find_by_id(&self, id: &str) -> Result<Session, StoreError>;

    /// Atomically append one exchange; `NotFound` if the session is missing.
    /// Returns the stored entry.
    async fn append_exchange(
        &self,
        session_id: &str,
        user_message: &str,
        ai_response: &str,
    ) -> Result<Exchange, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
