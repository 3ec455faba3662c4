//! In-memory stores for tests and ephemeral servers.

use async_trait::async_trait;
use chrono::Utc;
use deskmate_core::error::StoreError;
use deskmate_core::knowledge::{KnowledgeDocument, KnowledgeStore, NewKnowledgeDocument};
use deskmate_core::session::{Exchange, Session, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Knowledge documents kept in a Vec in insertion order.
pub struct InMemoryKnowledgeStore {
    documents: Arc<RwLock<Vec<KnowledgeDocument>>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn insert(&self, document: NewKnowledgeDocument) -> Result<KnowledgeDocument, StoreError> {
        let stored = KnowledgeDocument {
            id: Uuid::new_v4().to_string(),
            filename: document.filename,
            content: document.content,
            file_type: document.file_type,
            file_size: document.file_size,
            uploaded_at: Utc::now(),
        };
        self.documents.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<KnowledgeDocument>, StoreError> {
        // Newest last in the Vec, so reversing gives upload time desc with
        // later insertion winning ties.
        Ok(self.documents.read().await.iter().rev().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<KnowledgeDocument, StoreError> {
        self.documents
            .read()
            .await
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| StoreError::knowledge_not_found(id))
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let len_before = documents.len();
        documents.retain(|d| d.id != id);
        if documents.len() < len_before {
            Ok(())
        } else {
            Err(StoreError::knowledge_not_found(id))
        }
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.documents.read().await.len())
    }
}

/// Sessions keyed by id.
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create(&self, user_id: Option<&str>) -> Result<Session, StoreError> {
        let session = Session::new(user_id);
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: &str) -> Result<Session, StoreError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::session_not_found(id))
    }

    async fn append_exchange(
        &self,
        session_id: &str,
        user_message: &str,
        ai_response: &str,
    ) -> Result<Exchange, StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::session_not_found(session_id))?;

        let exchange = Exchange {
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            timestamp: Utc::now(),
        };
        session.messages.push(exchange.clone());
        Ok(exchange)
    }
}
